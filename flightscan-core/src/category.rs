//! ADS-B emitter category labels.
//!
//! OpenSky reports the category as field 17 of the extended state vector.

/// Label for codes outside the table.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Known emitter category table.
pub const CATEGORY_TABLE: &[(u8, &str)] = &[
    (0, "No info"),
    (1, "No ADS-B info"),
    (2, "Light (< 15,500 lbs)"),
    (3, "Small (15,500-75,000 lbs)"),
    (4, "Large (75,000-300,000 lbs)"),
    (5, "High Vortex Large (B-757)"),
    (6, "Heavy (> 300,000 lbs)"),
    (7, "High Performance"),
    (8, "Rotorcraft"),
    (9, "Glider/Sailplane"),
    (10, "Lighter-than-air"),
    (11, "Parachutist/Skydiver"),
    (12, "Ultralight/Paraglider"),
    (13, "Reserved"),
    (14, "UAV"),
    (15, "Space Vehicle"),
    (16, "Emergency Vehicle"),
    (17, "Service Vehicle"),
    (18, "Point Obstacle"),
    (19, "Cluster Obstacle"),
    (20, "Line Obstacle"),
];

/// Look up the label for a category code.
pub fn category_label(code: u8) -> &'static str {
    CATEGORY_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or(UNKNOWN_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heavy() {
        assert_eq!(category_label(6), "Heavy (> 300,000 lbs)");
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(category_label(99), UNKNOWN_CATEGORY);
        assert_eq!(category_label(21), UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_table_is_dense() {
        for code in 0..=20u8 {
            assert_ne!(category_label(code), UNKNOWN_CATEGORY, "code {code}");
        }
    }
}
