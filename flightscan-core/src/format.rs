//! Human-readable renderings of record fields for terminal output.

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// `"Ground"` for 0, plain feet under 1000, thousands above.
pub fn format_altitude(feet: i64) -> String {
    match feet {
        0 => "Ground".into(),
        f if f < 1000 => format!("{f} ft"),
        f => format!("{:.1}k ft", f as f64 / 1000.0),
    }
}

pub fn format_speed(knots: i64) -> String {
    format!("{knots} kts")
}

/// Degrees plus the nearest 8-point compass direction.
pub fn format_heading(degrees: i64) -> String {
    let idx = ((degrees as f64 / 45.0).round() as i64).rem_euclid(8) as usize;
    format!("{degrees}° {}", COMPASS[idx])
}

pub fn format_vertical_rate(fpm: i64) -> String {
    match fpm {
        0 => "Level".into(),
        v if v > 0 => format!("↑ {v} ft/min"),
        v => format!("↓ {} ft/min", v.abs()),
    }
}

/// Feet under one mile, otherwise miles with one decimal.
pub fn format_distance(miles: f64) -> String {
    if miles < 1.0 {
        format!("{:.0} ft", miles * 5280.0)
    } else {
        format!("{miles:.1} mi")
    }
}
