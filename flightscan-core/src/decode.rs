//! Decode OpenSky state vectors into typed reports and display records.
//!
//! OpenSky's `states/all` returns each aircraft as a flat JSON array. With
//! `extended=1` the array has 18 fields:
//!
//! | idx | field           | unit    |
//! |-----|-----------------|---------|
//! | 0   | icao24          |         |
//! | 1   | callsign        |         |
//! | 2   | origin_country  |         |
//! | 5   | longitude       | deg     |
//! | 6   | latitude        | deg     |
//! | 7   | baro_altitude   | m       |
//! | 8   | on_ground       |         |
//! | 9   | velocity        | m/s     |
//! | 10  | true_track      | deg     |
//! | 11  | vertical_rate   | m/s     |
//! | 17  | category        |         |
//!
//! Fields 3-4 and 12-16 (timestamps, sensors, geo altitude, squawk, SPI,
//! position source) are not used.

use serde::Deserialize;
use serde_json::Value;

use crate::category::category_label;
use crate::geo::{distance_miles, round_tenth};
use crate::types::*;

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

pub const METERS_TO_FEET: f64 = 3.28084;
pub const MS_TO_KNOTS: f64 = 1.94384;
pub const MS_TO_FEET_PER_MIN: f64 = 196.85;

const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_ON_GROUND: usize = 8;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_VERTICAL_RATE: usize = 11;
const IDX_CATEGORY: usize = 17;

/// Stands in for category values that are present but not a code in
/// `0..=255`; it has no label, so it displays as "Unknown".
pub const INVALID_CATEGORY: u8 = u8::MAX;

/// Scale an optional source value and round half up; absent values become 0.
///
/// Ties go toward +∞, so -2.5 rounds to -2 rather than -3.
pub fn convert(value: Option<f64>, factor: f64) -> i64 {
    value.map(|v| (v * factor + 0.5).floor() as i64).unwrap_or(0)
}

/// Null or absent means "no info" (0). Integral numbers in range are codes,
/// including float spellings like `6.0`; anything else is invalid.
fn decode_category(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_f64()
            .filter(|c| c.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(c))
            .map(|c| c as u8)
            .unwrap_or(INVALID_CATEGORY),
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level `states/all` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateList {
    /// Snapshot time, epoch seconds.
    pub time: Option<i64>,
    /// `null` when no aircraft are inside the box.
    #[serde(default)]
    pub states: Option<Vec<Value>>,
}

impl StateList {
    /// Parse a raw response body.
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// Snapshot time, falling back to `now` when the provider omitted it.
    pub fn timestamp_or(&self, now: i64) -> i64 {
        self.time.unwrap_or(now)
    }

    /// Decode every positional row, silently dropping the rest.
    pub fn reports(&self) -> impl Iterator<Item = PositionReport> + '_ {
        self.states
            .iter()
            .flatten()
            .filter_map(Value::as_array)
            .filter_map(|row| decode_state(row))
    }

    pub fn row_count(&self) -> usize {
        self.states.as_ref().map_or(0, Vec::len)
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn field_f64(row: &[Value], idx: usize) -> Option<f64> {
    row.get(idx).and_then(Value::as_f64)
}

fn field_str(row: &[Value], idx: usize) -> Option<&str> {
    row.get(idx).and_then(Value::as_str)
}

/// Decode one state vector.
///
/// Returns `None` for rows without a position or without an ICAO24 address.
/// Short rows are tolerated: missing fields read as null, so a row from a
/// non-extended query gets category 0.
pub fn decode_state(row: &[Value]) -> Option<PositionReport> {
    let icao24 = field_str(row, IDX_ICAO24)?.trim().to_ascii_lowercase();
    if icao24.is_empty() {
        return None;
    }

    let latitude = field_f64(row, IDX_LATITUDE)?;
    let longitude = field_f64(row, IDX_LONGITUDE)?;

    let callsign = field_str(row, IDX_CALLSIGN)
        .map(str::trim)
        .filter(|cs| !cs.is_empty())
        .map(str::to_string);

    let category = decode_category(row.get(IDX_CATEGORY));

    Some(PositionReport {
        icao24,
        callsign,
        origin_country: field_str(row, IDX_ORIGIN_COUNTRY)
            .unwrap_or_default()
            .to_string(),
        latitude,
        longitude,
        baro_altitude_m: field_f64(row, IDX_BARO_ALTITUDE),
        on_ground: row
            .get(IDX_ON_GROUND)
            .and_then(Value::as_bool)
            .unwrap_or(false),
        velocity_ms: field_f64(row, IDX_VELOCITY),
        true_track_deg: field_f64(row, IDX_TRUE_TRACK),
        vertical_rate_ms: field_f64(row, IDX_VERTICAL_RATE),
        category,
    })
}

/// Convert a report to display units relative to a query center.
///
/// Enrichment fields start as [`NOT_AVAILABLE`].
pub fn to_record(report: PositionReport, center_lat: f64, center_lon: f64) -> AircraftRecord {
    let distance = distance_miles(center_lat, center_lon, report.latitude, report.longitude);
    let display_callsign = report
        .callsign
        .clone()
        .unwrap_or_else(|| report.icao24.to_ascii_uppercase());

    AircraftRecord {
        callsign: display_callsign,
        origin_country: report.origin_country,
        latitude: report.latitude,
        longitude: report.longitude,
        altitude: convert(report.baro_altitude_m, METERS_TO_FEET),
        ground_speed: convert(report.velocity_ms, MS_TO_KNOTS),
        heading: convert(report.true_track_deg, 1.0),
        vertical_rate: convert(report.vertical_rate_ms, MS_TO_FEET_PER_MIN),
        on_ground: report.on_ground,
        category: category_label(report.category).to_string(),
        distance_from_center: round_tenth(distance),
        departure_airport: NOT_AVAILABLE.to_string(),
        arrival_airport: NOT_AVAILABLE.to_string(),
        aircraft_type: NOT_AVAILABLE.to_string(),
        reported_callsign: report.callsign,
        icao24: report.icao24,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
