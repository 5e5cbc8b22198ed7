//! Data models for the hazard analytics service
//!
//! This module contains the core domain models organized by concern:
//! - Location: payload variants and their normalized form
//! - TimeSeries: date-indexed provider tables and passthrough records
//! - Features: reduced hazard statistics and their units
//! - Fire: hotspot detection rows

pub mod features;
pub mod fire;
pub mod location;
pub mod timeseries;

// Re-export all public types for convenient access
pub use features::{
    ClimateFeatures, Coverage, DroughtFeatures, FeatureUnits, FireFeatures, HazardFeatures,
};
pub use fire::FireDetection;
pub use location::{BoundingBox, LocationInput, LocationPayload, NormalizedLocation};
pub use timeseries::{ISO_DATE, TimeSeries, TimeSeriesRecord};
