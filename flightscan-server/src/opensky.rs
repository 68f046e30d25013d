//! OpenSky Network client — live state vectors inside a bounding box.
//!
//! Anonymous access works with lower rate limits; Basic Auth is attached
//! only when complete credentials were configured. Transport failures are
//! retried per [`RetryPolicy`]; an HTTP error status is returned as-is.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use flightscan_core::config::{Credentials, OpenSkyConfig};
use flightscan_core::{BoundingBox, StateList};

use crate::retry::{RetryError, RetryPolicy};

/// Failures surfaced to the orchestrator.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Every attempt timed out or failed at the network level.
    #[error("OpenSky unreachable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },
    /// OpenSky answered with a non-success status.
    #[error("OpenSky returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("malformed OpenSky response: {0}")]
    Decode(String),
    #[error("could not build OpenSky request: {0}")]
    Request(String),
}

/// Source of live state vectors. The HTTP client is the production
/// implementation; tests substitute canned data.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch_states(&self, bbox: &BoundingBox) -> Result<StateList, UpstreamError>;
}

/// Outcome of a single request attempt.
#[derive(Debug)]
enum AttemptError {
    Transport(reqwest::Error),
    Status { status: u16, body: String },
    Decode(String),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Transport(e) if !e.is_builder())
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Transport(e) if e.is_timeout() => write!(f, "timed out: {e}"),
            AttemptError::Transport(e) => write!(f, "transport error: {e}"),
            AttemptError::Status { status, .. } => write!(f, "HTTP {status}"),
            AttemptError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

pub struct OpenSkyClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    retry: RetryPolicy,
}

impl OpenSkyClient {
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(OpenSkyClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            retry,
        })
    }

    pub fn from_config(
        config: &OpenSkyConfig,
        credentials: Option<Credentials>,
    ) -> reqwest::Result<Self> {
        Self::new(
            &config.base_url,
            credentials,
            config.timeout(),
            RetryPolicy::new(config.max_attempts, config.backoff()),
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    fn states_url(&self) -> String {
        format!("{}/states/all", self.base_url)
    }

    async fn attempt(&self, bbox: &BoundingBox) -> Result<StateList, AttemptError> {
        let mut request = self
            .http
            .get(self.states_url())
            .query(&bbox.query_pairs()[..])
            .query(&[("extended", "1")]);

        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await.map_err(AttemptError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(AttemptError::Transport)?;
        StateList::from_json(&body).map_err(|e| AttemptError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StateSource for OpenSkyClient {
    async fn fetch_states(&self, bbox: &BoundingBox) -> Result<StateList, UpstreamError> {
        let result = self
            .retry
            .run(
                |attempt| {
                    tracing::debug!(
                        attempt = attempt + 1,
                        authenticated = self.is_authenticated(),
                        "Requesting OpenSky states"
                    );
                    self.attempt(bbox)
                },
                AttemptError::is_retryable,
            )
            .await;

        match result {
            Ok(states) => {
                tracing::debug!(rows = states.row_count(), "OpenSky states received");
                Ok(states)
            }
            Err(RetryError::Exhausted { attempts, last }) => Err(UpstreamError::Unavailable {
                attempts,
                message: last.to_string(),
            }),
            Err(RetryError::Fatal(AttemptError::Status { status, body })) => {
                tracing::warn!(status, body = %body, "OpenSky API error");
                Err(UpstreamError::Status { status, body })
            }
            Err(RetryError::Fatal(AttemptError::Decode(msg))) => Err(UpstreamError::Decode(msg)),
            Err(RetryError::Fatal(AttemptError::Transport(e))) => {
                Err(UpstreamError::Request(e.to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
