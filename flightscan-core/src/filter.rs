//! Geofilter — keep aircraft inside the query radius, nearest first.

use crate::decode::{to_record, StateList};
use crate::types::AircraftRecord;

/// Circular search area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub lat: f64,
    pub lon: f64,
    pub radius_miles: f64,
}

impl SearchArea {
    pub fn new(lat: f64, lon: f64, radius_miles: f64) -> Self {
        SearchArea {
            lat,
            lon,
            radius_miles,
        }
    }

    pub fn bounding_box(&self) -> crate::geo::BoundingBox {
        crate::geo::bounding_box(self.lat, self.lon, self.radius_miles)
    }
}

/// Decode, filter by radius and sort ascending by distance.
///
/// The radius check uses the rounded `distance_from_center` so the served
/// value never exceeds the requested radius. The bounding box handed to the
/// provider is only an approximation; corner hits are dropped here.
pub fn nearby_aircraft(states: &StateList, area: &SearchArea) -> Vec<AircraftRecord> {
    let mut flights: Vec<AircraftRecord> = states
        .reports()
        .map(|report| to_record(report, area.lat, area.lon))
        .filter(|rec| rec.distance_from_center <= area.radius_miles)
        .collect();

    sort_by_distance(&mut flights);
    flights
}

/// Stable ascending sort on `distance_from_center`.
pub fn sort_by_distance(flights: &mut [AircraftRecord]) {
    flights.sort_by(|a, b| a.distance_from_center.total_cmp(&b.distance_from_center));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
