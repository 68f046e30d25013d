//! flightscan-core: Pure decode + geofilter library for nearby-flight queries.
//!
//! No async, no network I/O — just algorithms over OpenSky state vectors.
//! This crate is the shared core used by `flightscan-server` (HTTP API + CLI).

pub mod category;
pub mod config;
pub mod decode;
pub mod filter;
pub mod format;
pub mod geo;
pub mod types;

// Re-export commonly used types at crate root
pub use decode::{decode_state, to_record, StateList};
pub use filter::{nearby_aircraft, SearchArea};
pub use geo::{bounding_box, distance_miles, BoundingBox};
pub use types::*;
