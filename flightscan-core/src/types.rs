//! Shared types, error enum, and domain records for flightscan-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by flightscan-core.
#[derive(Debug, Error)]
pub enum FlightScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FlightScanError>;

/// Placeholder for enrichment fields that have no data.
pub const NOT_AVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Provider A records
// ---------------------------------------------------------------------------

/// One aircraft's telemetry snapshot as reported by OpenSky, in source units.
///
/// Only reports with both latitude and longitude are ever constructed; the
/// decoder drops non-positional rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    /// 24-bit transponder address, 6 lowercase hex chars.
    pub icao24: String,
    /// Trimmed callsign, `None` when absent or blank.
    pub callsign: Option<String>,
    pub origin_country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Barometric altitude in meters.
    pub baro_altitude_m: Option<f64>,
    pub on_ground: bool,
    /// Ground speed in m/s.
    pub velocity_ms: Option<f64>,
    /// True track in degrees clockwise from north.
    pub true_track_deg: Option<f64>,
    /// Vertical rate in m/s.
    pub vertical_rate_ms: Option<f64>,
    /// ADS-B emitter category, 0 when not provided and
    /// [`INVALID_CATEGORY`](crate::decode::INVALID_CATEGORY) when unusable.
    pub category: u8,
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// A nearby aircraft in display units, as served by `/api/flights`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftRecord {
    pub icao24: String,
    /// Callsign, or the uppercased ICAO24 when the aircraft sent none.
    pub callsign: String,
    pub origin_country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Feet.
    pub altitude: i64,
    /// Knots.
    pub ground_speed: i64,
    /// Degrees.
    pub heading: i64,
    /// Feet per minute.
    pub vertical_rate: i64,
    pub on_ground: bool,
    pub category: String,
    /// Miles from the query center, one decimal.
    pub distance_from_center: f64,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub aircraft_type: String,

    /// Callsign as broadcast. Route lookups key on this, never on the
    /// ICAO24 fallback above.
    #[serde(skip)]
    pub reported_callsign: Option<String>,
}

impl AircraftRecord {
    /// True once any enrichment field holds real data.
    pub fn is_enriched(&self) -> bool {
        self.departure_airport != NOT_AVAILABLE
            || self.arrival_airport != NOT_AVAILABLE
            || self.aircraft_type != NOT_AVAILABLE
    }
}

/// Body of a successful `/api/flights` response.
#[derive(Debug, Clone, Serialize)]
pub struct FlightResponse {
    /// Epoch seconds of the provider snapshot.
    pub timestamp: i64,
    pub count: usize,
    pub flights: Vec<AircraftRecord>,
}

impl FlightResponse {
    pub fn new(timestamp: i64, flights: Vec<AircraftRecord>) -> Self {
        FlightResponse {
            timestamp,
            count: flights.len(),
            flights,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
