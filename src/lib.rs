//! Hazard analytics - climate, drought and fire features for a location
//!
//! This library normalizes point, bbox and polygon locations, fetches daily
//! series from NASA POWER, CHIRPS (Earth Engine) and NASA FIRMS, and reduces
//! them into summary statistics served over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod providers;
pub mod reducer;
pub mod service;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use config::HazardConfig;
pub use error::{HazardError, ProviderKind};
pub use models::{BoundingBox, HazardFeatures, LocationPayload, NormalizedLocation, TimeSeries};
pub use service::{DateWindow, HazardService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, HazardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
