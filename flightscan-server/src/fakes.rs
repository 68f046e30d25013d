//! In-memory providers for pipeline and router tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use flightscan_core::{BoundingBox, StateList};

use crate::adsbdb::{Enricher, Route};
use crate::opensky::{StateSource, UpstreamError};

/// `n` airborne aircraft due north of (40, -75), 0.01° apart, listed
/// farthest first so callers can check sorting.
pub fn grid_states(n: usize) -> StateList {
    let rows: Vec<Value> = (0..n)
        .rev()
        .map(|i| {
            json!([
                format!("a{i:05x}"), format!("TST{i} "), "United States", 1700000000, 1700000000,
                -75.0, 40.0 + 0.01 * (i as f64 + 1.0), 3048.0, false,
                200.0, 90.0, 0.0, null, 3100.0, "1200", false, 0, 3
            ])
        })
        .collect();
    StateList {
        time: Some(1_700_000_000),
        states: Some(rows),
    }
}

enum SourceBehavior {
    States(StateList),
    Unavailable,
    Status(u16, String),
    Decode,
}

pub struct FakeSource {
    behavior: SourceBehavior,
}

impl FakeSource {
    pub fn states(states: StateList) -> Self {
        FakeSource {
            behavior: SourceBehavior::States(states),
        }
    }

    pub fn unavailable() -> Self {
        FakeSource {
            behavior: SourceBehavior::Unavailable,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        FakeSource {
            behavior: SourceBehavior::Status(status, body.to_string()),
        }
    }

    pub fn malformed() -> Self {
        FakeSource {
            behavior: SourceBehavior::Decode,
        }
    }
}

#[async_trait]
impl StateSource for FakeSource {
    async fn fetch_states(&self, _bbox: &BoundingBox) -> Result<StateList, UpstreamError> {
        match &self.behavior {
            SourceBehavior::States(s) => Ok(s.clone()),
            SourceBehavior::Unavailable => Err(UpstreamError::Unavailable {
                attempts: 3,
                message: "timed out".into(),
            }),
            SourceBehavior::Status(status, body) => Err(UpstreamError::Status {
                status: *status,
                body: body.clone(),
            }),
            SourceBehavior::Decode => Err(UpstreamError::Decode("expected value".into())),
        }
    }
}

enum EnricherBehavior {
    Ok,
    Failing,
    Slow(Duration),
}

pub struct FakeEnricher {
    behavior: EnricherBehavior,
    route_calls: AtomicUsize,
    aircraft_calls: AtomicUsize,
}

impl FakeEnricher {
    fn with(behavior: EnricherBehavior) -> Self {
        FakeEnricher {
            behavior,
            route_calls: AtomicUsize::new(0),
            aircraft_calls: AtomicUsize::new(0),
        }
    }

    pub fn ok() -> Self {
        Self::with(EnricherBehavior::Ok)
    }

    pub fn failing() -> Self {
        Self::with(EnricherBehavior::Failing)
    }

    pub fn slow(delay: Duration) -> Self {
        Self::with(EnricherBehavior::Slow(delay))
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    pub fn aircraft_calls(&self) -> usize {
        self.aircraft_calls.load(Ordering::SeqCst)
    }

    /// `true` when the lookup should produce data.
    async fn settle(&self) -> bool {
        match self.behavior {
            EnricherBehavior::Ok => true,
            EnricherBehavior::Failing => false,
            EnricherBehavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
        }
    }
}

#[async_trait]
impl Enricher for FakeEnricher {
    async fn route(&self, _callsign: &str) -> Option<Route> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        self.settle().await.then(|| Route {
            departure: "SFO".into(),
            arrival: "JFK".into(),
        })
    }

    async fn aircraft_type(&self, _icao24: &str) -> Option<String> {
        self.aircraft_calls.fetch_add(1, Ordering::SeqCst);
        self.settle().await.then(|| "Boeing 737-800".to_string())
    }
}
