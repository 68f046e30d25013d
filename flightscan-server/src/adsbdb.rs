//! adsbdb.com lookups — flight route by callsign, aircraft model by ICAO24.
//!
//! Enrichment is optional. Every failure (non-2xx, network error, timeout,
//! unexpected JSON) is logged at debug level and reported as "no data".

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use flightscan_core::config::AdsbdbConfig;

/// Origin and destination airport codes (IATA preferred, ICAO fallback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub departure: String,
    pub arrival: String,
}

/// Best-effort route and aircraft-model lookups.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Route for a callsign. `None` unless both legs are known.
    async fn route(&self, callsign: &str) -> Option<Route>;

    /// Aircraft model description for an ICAO24 address.
    async fn aircraft_type(&self, icao24: &str) -> Option<String>;
}

pub struct AdsbdbClient {
    http: reqwest::Client,
    base_url: String,
}

impl AdsbdbClient {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(AdsbdbClient {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &AdsbdbConfig) -> reqwest::Result<Self> {
        Self::new(&config.base_url, config.timeout())
    }

    /// GET `{base}/{kind}/{key}` and parse the body as JSON.
    async fn get_json(&self, kind: &str, key: &str) -> Option<Value> {
        let mut url = reqwest::Url::parse(&self.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(kind)
            .push(key);

        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(kind, key, error = %e, "adsbdb request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(kind, key, status = status.as_u16(), "adsbdb lookup miss");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(kind, key, error = %e, "adsbdb response unreadable");
                None
            }
        }
    }
}

#[async_trait]
impl Enricher for AdsbdbClient {
    async fn route(&self, callsign: &str) -> Option<Route> {
        let callsign = callsign.trim();
        if callsign.is_empty() {
            return None;
        }
        let body = self.get_json("callsign", callsign).await?;
        parse_route(&body)
    }

    async fn aircraft_type(&self, icao24: &str) -> Option<String> {
        let icao24 = icao24.trim();
        if icao24.is_empty() {
            return None;
        }
        let body = self.get_json("aircraft", &icao24.to_ascii_uppercase()).await?;
        parse_aircraft_type(&body)
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extract a complete route from `{"response": {"flightroute": {...}}}`.
pub fn parse_route(body: &Value) -> Option<Route> {
    let route = body.pointer("/response/flightroute")?;
    let leg = |name: &str| -> Option<String> {
        let airport = route.get(name)?;
        non_empty(airport.get("iata_code"))
            .or_else(|| non_empty(airport.get("icao_code")))
            .map(str::to_string)
    };

    Some(Route {
        departure: leg("origin")?,
        arrival: leg("destination")?,
    })
}

/// Describe the aircraft in `{"response": {"aircraft": {...}}}`:
/// "manufacturer type", else type, else the ICAO type designator.
pub fn parse_aircraft_type(body: &Value) -> Option<String> {
    let aircraft = body.pointer("/response/aircraft")?;
    match (
        non_empty(aircraft.get("manufacturer")),
        non_empty(aircraft.get("type")),
    ) {
        (Some(manufacturer), Some(model)) => Some(format!("{manufacturer} {model}")),
        (None, Some(model)) => Some(model.to_string()),
        _ => non_empty(aircraft.get("icao_type")).map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
