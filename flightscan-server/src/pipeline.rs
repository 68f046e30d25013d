//! Request orchestration — validate, fetch, geofilter, enrich.
//!
//! One `run` per request; nothing is shared between requests except the
//! read-only clients and settings.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::join;
use thiserror::Error;

use flightscan_core::config::Config;
use flightscan_core::{nearby_aircraft, AircraftRecord, FlightResponse, SearchArea};

use crate::adsbdb::{Enricher, Route};
use crate::fanout::join_with_deadline;
use crate::opensky::{StateSource, UpstreamError};

/// Launch delays stop growing after this many steps.
const MAX_STAGGER_STEPS: u32 = 10;

// ---------------------------------------------------------------------------
// Query validation
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Missing required parameters: lat, lon, radius")]
    Missing,
    #[error("Invalid parameter values")]
    Invalid,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_number(raw: &str) -> Result<f64, QueryError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(QueryError::Invalid)
}

/// Validate raw `lat`, `lon`, `radius` query values.
///
/// Absent or empty values are "missing"; anything that is not a finite
/// number, or a negative radius, is "invalid".
pub fn parse_area(
    lat: Option<&str>,
    lon: Option<&str>,
    radius: Option<&str>,
) -> Result<SearchArea, QueryError> {
    let (Some(lat), Some(lon), Some(radius)) = (present(lat), present(lon), present(radius))
    else {
        return Err(QueryError::Missing);
    };

    let area = SearchArea::new(parse_number(lat)?, parse_number(lon)?, parse_number(radius)?);
    if area.radius_miles < 0.0 {
        return Err(QueryError::Invalid);
    }
    Ok(area)
}

/// Anything that stops a flights query from producing a response.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Nearest N aircraft to enrich.
    pub enrich_limit: usize,
    /// Ceiling for the whole enrichment fan-out.
    pub enrich_ceiling: Duration,
    /// Per-aircraft launch delay step.
    pub stagger: Duration,
    /// Seconds advertised in `Retry-After` when OpenSky is unreachable.
    pub retry_after_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from_config(&Config::default())
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Settings {
            enrich_limit: config.enrichment.limit,
            enrich_ceiling: config.enrichment.ceiling(),
            stagger: config.enrichment.stagger(),
            retry_after_secs: config.opensky.retry_after_secs,
        }
    }

    fn launch_delay(&self, index: usize) -> Duration {
        self.stagger
            .saturating_mul((index as u32).min(MAX_STAGGER_STEPS))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct Pipeline {
    source: Arc<dyn StateSource>,
    enricher: Arc<dyn Enricher>,
    settings: Settings,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn StateSource>,
        enricher: Arc<dyn Enricher>,
        settings: Settings,
    ) -> Self {
        Pipeline {
            source,
            enricher,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate raw query values, then [`run`](Self::run).
    pub async fn query(
        &self,
        lat: Option<&str>,
        lon: Option<&str>,
        radius: Option<&str>,
    ) -> Result<FlightResponse, PipelineError> {
        let area = parse_area(lat, lon, radius)?;
        Ok(self.run(&area).await?)
    }

    /// Fetch, filter, sort and enrich the aircraft around `area`.
    ///
    /// Only OpenSky failures are errors. Enrichment never fails the call.
    pub async fn run(&self, area: &SearchArea) -> Result<FlightResponse, UpstreamError> {
        let bbox = area.bounding_box();
        let states = self.source.fetch_states(&bbox).await?;

        let mut flights = nearby_aircraft(&states, area);
        let enriched = enrich_nearest(&mut flights, &self.enricher, &self.settings).await;

        tracing::info!(
            lat = area.lat,
            lon = area.lon,
            radius = area.radius_miles,
            rows = states.row_count(),
            nearby = flights.len(),
            enriched,
            "Flights query served"
        );

        Ok(FlightResponse::new(states.timestamp_or(now_epoch()), flights))
    }
}

/// Enrich the first `settings.enrich_limit` records in place.
///
/// Each selected record runs its route and model lookups concurrently; all
/// records run concurrently under one deadline. Lookups still in flight at
/// the deadline are abandoned and their records keep the `N/A` sentinels.
/// Returns how many records gained any data.
pub async fn enrich_nearest(
    flights: &mut [AircraftRecord],
    enricher: &Arc<dyn Enricher>,
    settings: &Settings,
) -> usize {
    let selected = flights.len().min(settings.enrich_limit);
    if selected == 0 {
        return 0;
    }

    let tasks: Vec<_> = flights[..selected]
        .iter()
        .enumerate()
        .map(|(idx, rec)| {
            let enricher = Arc::clone(enricher);
            let callsign = rec.reported_callsign.clone();
            let icao24 = rec.icao24.clone();
            let delay = settings.launch_delay(idx);

            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let route = async {
                    match callsign.as_deref() {
                        Some(cs) => enricher.route(cs).await,
                        None => None,
                    }
                };
                join(route, enricher.aircraft_type(&icao24)).await
            }
        })
        .collect();

    let outcomes = join_with_deadline(tasks, settings.enrich_ceiling).await;

    let mut enriched = 0;
    for (rec, outcome) in flights.iter_mut().zip(outcomes) {
        let Some((route, model)) = outcome else {
            continue;
        };
        apply_enrichment(rec, route, model);
        if rec.is_enriched() {
            enriched += 1;
        }
    }
    enriched
}

fn apply_enrichment(rec: &mut AircraftRecord, route: Option<Route>, model: Option<String>) {
    if let Some(route) = route {
        rec.departure_airport = route.departure;
        rec.arrival_airport = route.arrival;
    }
    if let Some(model) = model {
        rec.aircraft_type = model;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{grid_states, FakeEnricher, FakeSource};
    use flightscan_core::NOT_AVAILABLE;
    use std::time::Instant;

    fn fast_settings() -> Settings {
        Settings {
            enrich_limit: 30,
            enrich_ceiling: Duration::from_millis(300),
            stagger: Duration::ZERO,
            retry_after_secs: 30,
        }
    }

    fn pipeline(source: FakeSource, enricher: FakeEnricher) -> (Pipeline, Arc<FakeEnricher>) {
        let enricher = Arc::new(enricher);
        let p = Pipeline::new(Arc::new(source), enricher.clone(), fast_settings());
        (p, enricher)
    }

    #[test]
    fn test_parse_area_ok() {
        let area = parse_area(Some("37.6"), Some("-122.4"), Some("25")).unwrap();
        assert_eq!(area, SearchArea::new(37.6, -122.4, 25.0));
    }

    #[test]
    fn test_parse_area_missing() {
        assert_eq!(parse_area(None, Some("1"), Some("1")), Err(QueryError::Missing));
        assert_eq!(parse_area(Some("1"), Some("1"), None), Err(QueryError::Missing));
        assert_eq!(parse_area(Some(""), Some("1"), Some("1")), Err(QueryError::Missing));
    }

    #[test]
    fn test_parse_area_invalid() {
        assert_eq!(parse_area(Some("abc"), Some("1"), Some("1")), Err(QueryError::Invalid));
        assert_eq!(parse_area(Some("1"), Some("NaN"), Some("1")), Err(QueryError::Invalid));
        assert_eq!(parse_area(Some("1"), Some("1"), Some("inf")), Err(QueryError::Invalid));
        assert_eq!(parse_area(Some("1"), Some("1"), Some("-5")), Err(QueryError::Invalid));
        assert_eq!(parse_area(Some("12abc"), Some("1"), Some("5")), Err(QueryError::Invalid));
    }

    #[test]
    fn test_launch_delay_capped() {
        let s = Settings {
            stagger: Duration::from_millis(50),
            ..fast_settings()
        };
        assert_eq!(s.launch_delay(0), Duration::ZERO);
        assert_eq!(s.launch_delay(3), Duration::from_millis(150));
        assert_eq!(s.launch_delay(25), Duration::from_millis(500));
    }

    #[test]
    fn test_launch_delay_saturates() {
        let s = Settings {
            stagger: Duration::from_millis(u64::MAX),
            ..fast_settings()
        };
        assert_eq!(s.launch_delay(10), Duration::MAX);
    }

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert_eq!(s.enrich_limit, 30);
        assert_eq!(s.enrich_ceiling, Duration::from_secs(5));
        assert_eq!(s.stagger, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_run_enriches_and_sorts() {
        let (p, _) = pipeline(FakeSource::states(grid_states(5)), FakeEnricher::ok());
        let resp = p.run(&SearchArea::new(40.0, -75.0, 100.0)).await.unwrap();

        assert_eq!(resp.count, 5);
        assert_eq!(resp.timestamp, 1_700_000_000);
        for pair in resp.flights.windows(2) {
            assert!(pair[0].distance_from_center <= pair[1].distance_from_center);
        }
        let first = &resp.flights[0];
        assert_eq!(first.departure_airport, "SFO");
        assert_eq!(first.arrival_airport, "JFK");
        assert_eq!(first.aircraft_type, "Boeing 737-800");
    }

    #[tokio::test]
    async fn test_only_nearest_thirty_enriched() {
        let (p, enricher) = pipeline(FakeSource::states(grid_states(50)), FakeEnricher::ok());
        let resp = p.run(&SearchArea::new(40.0, -75.0, 500.0)).await.unwrap();

        assert_eq!(resp.count, 50);
        assert_eq!(enricher.aircraft_calls(), 30);
        assert_eq!(enricher.route_calls(), 30);
        for (i, f) in resp.flights.iter().enumerate() {
            if i < 30 {
                assert_eq!(f.aircraft_type, "Boeing 737-800", "record {i}");
            } else {
                assert_eq!(f.departure_airport, NOT_AVAILABLE, "record {i}");
                assert_eq!(f.arrival_airport, NOT_AVAILABLE, "record {i}");
                assert_eq!(f.aircraft_type, NOT_AVAILABLE, "record {i}");
            }
        }
    }

    #[tokio::test]
    async fn test_failing_enricher_keeps_sentinels() {
        let (p, _) = pipeline(FakeSource::states(grid_states(3)), FakeEnricher::failing());
        let resp = p.run(&SearchArea::new(40.0, -75.0, 100.0)).await.unwrap();
        assert_eq!(resp.count, 3);
        for f in &resp.flights {
            assert_eq!(f.departure_airport, NOT_AVAILABLE);
            assert_eq!(f.arrival_airport, NOT_AVAILABLE);
            assert_eq!(f.aircraft_type, NOT_AVAILABLE);
        }
    }

    #[tokio::test]
    async fn test_slow_enricher_abandoned_at_ceiling() {
        let (p, _) = pipeline(
            FakeSource::states(grid_states(4)),
            FakeEnricher::slow(Duration::from_secs(3)),
        );
        let start = Instant::now();
        let resp = p.run(&SearchArea::new(40.0, -75.0, 100.0)).await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
        assert_eq!(resp.count, 4);
        assert!(resp.flights.iter().all(|f| !f.is_enriched()));
    }

    #[tokio::test]
    async fn test_route_skipped_without_callsign() {
        let mut states = grid_states(2);
        if let Some(rows) = states.states.as_mut() {
            for row in rows.iter_mut() {
                row[1] = serde_json::Value::Null;
            }
        }
        let (p, enricher) = pipeline(FakeSource::states(states), FakeEnricher::ok());
        let resp = p.run(&SearchArea::new(40.0, -75.0, 100.0)).await.unwrap();

        assert_eq!(enricher.route_calls(), 0);
        assert_eq!(enricher.aircraft_calls(), 2);
        assert_eq!(resp.flights[0].departure_airport, NOT_AVAILABLE);
        assert_eq!(resp.flights[0].aircraft_type, "Boeing 737-800");
    }

    #[tokio::test]
    async fn test_zero_limit_skips_enrichment() {
        let enricher = Arc::new(FakeEnricher::ok());
        let settings = Settings {
            enrich_limit: 0,
            ..fast_settings()
        };
        let p = Pipeline::new(
            Arc::new(FakeSource::states(grid_states(3))),
            enricher.clone(),
            settings,
        );
        p.run(&SearchArea::new(40.0, -75.0, 100.0)).await.unwrap();
        assert_eq!(enricher.aircraft_calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let (p, enricher) = pipeline(FakeSource::unavailable(), FakeEnricher::ok());
        let err = p.run(&SearchArea::new(40.0, -75.0, 10.0)).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable { attempts: 3, .. }));
        assert_eq!(enricher.aircraft_calls(), 0);
    }

    #[tokio::test]
    async fn test_query_validates_before_fetching() {
        let (p, _) = pipeline(FakeSource::unavailable(), FakeEnricher::ok());
        let err = p.query(Some("40"), None, Some("5")).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidQuery(QueryError::Missing)));

        let err = p.query(Some("40"), Some("-75"), Some("5")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_timestamp_falls_back_to_now() {
        let mut states = grid_states(1);
        states.time = None;
        let (p, _) = pipeline(FakeSource::states(states), FakeEnricher::ok());
        let before = now_epoch();
        let resp = p.run(&SearchArea::new(40.0, -75.0, 100.0)).await.unwrap();
        assert!(resp.timestamp >= before);
    }
}
