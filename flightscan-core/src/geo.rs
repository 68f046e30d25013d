//! Geometry — great-circle distance and query bounding boxes.
//!
//! Distances are statute miles throughout, matching the `radius` query
//! parameter of `/api/flights`.

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Approximate statute miles per degree of latitude.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Great-circle distance in miles (haversine).
///
/// NaN inputs propagate; callers validate coordinates first.
pub fn distance_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_MILES * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Round to one decimal place.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rectangular lat/lon region approximating a circular search area.
///
/// Field names follow the OpenSky query parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lamin: f64,
    pub lamax: f64,
    pub lomin: f64,
    pub lomax: f64,
}

impl BoundingBox {
    /// Query parameters for the OpenSky `states/all` endpoint.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("lamin", self.lamin.to_string()),
            ("lamax", self.lamax.to_string()),
            ("lomin", self.lomin.to_string()),
            ("lomax", self.lomax.to_string()),
        ]
    }
}

/// Bounding box around a center point.
///
/// The longitude half-width is scaled by 1/cos(lat). Near the poles the
/// cosine approaches zero and the longitude span blows up toward infinity.
/// That degenerate case is left as-is: there is no agreed-upon behavior for
/// polar queries.
pub fn bounding_box(lat: f64, lon: f64, radius_miles: f64) -> BoundingBox {
    let lat_delta = radius_miles / MILES_PER_DEGREE;
    let lon_delta = radius_miles / (MILES_PER_DEGREE * lat.to_radians().cos());

    BoundingBox {
        lamin: lat - lat_delta,
        lamax: lat + lat_delta,
        lomin: lon - lon_delta,
        lomax: lon + lon_delta,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_point() {
        let d = distance_miles(35.0, -82.0, 35.0, -82.0);
        assert!(d < 0.001, "same point should be ~0 mi, got {d}");
    }

    #[test]
    fn test_distance_known_pair() {
        // JFK to LAX: ~2475 mi
        let d = distance_miles(40.6413, -73.7781, 33.9416, -118.4085);
        assert!((d - 2475.0).abs() < 15.0, "JFK-LAX should be ~2475 mi, got {d}");
    }

    #[test]
    fn test_distance_symmetric() {
        let a = distance_miles(51.47, -0.45, 48.86, 2.35);
        let b = distance_miles(48.86, 2.35, 51.47, -0.45);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_distance_nan_propagates() {
        assert!(distance_miles(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(4.24), 4.2);
        assert_eq!(round_tenth(4.25), 4.3);
        assert_eq!(round_tenth(0.0), 0.0);
    }

    #[test]
    fn test_bounding_box_equator() {
        let bbox = bounding_box(0.0, 0.0, 69.0);
        assert!((bbox.lamin + 1.0).abs() < 1e-9);
        assert!((bbox.lamax - 1.0).abs() < 1e-9);
        assert!((bbox.lomin + 1.0).abs() < 1e-9);
        assert!((bbox.lomax - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box_widens_with_latitude() {
        let bbox = bounding_box(60.0, 10.0, 69.0);
        // cos(60°) = 0.5 → longitude half-width doubles
        assert!((bbox.lomax - bbox.lomin - 4.0).abs() < 1e-9);
        assert!((bbox.lamax - bbox.lamin - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box_polar_degenerate() {
        let bbox = bounding_box(90.0, 0.0, 10.0);
        assert!(bbox.lomax - bbox.lomin > 1.0e6);
    }

    #[test]
    fn test_query_pairs() {
        let pairs = bounding_box(0.0, 0.0, 69.0).query_pairs();
        assert_eq!(pairs[0], ("lamin", "-1".to_string()));
        assert_eq!(pairs[3], ("lomax", "1".to_string()));
    }
}
