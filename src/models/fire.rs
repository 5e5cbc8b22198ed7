//! Fire hotspot detection rows

use serde::{Deserialize, Serialize};

/// One hotspot detection as delivered by a FIRMS-style provider.
///
/// VIIRS products report brightness as `bright_ti4`, MODIS as `brightness`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireDetection {
    pub latitude: f64,
    pub longitude: f64,
    /// Brightness temperature in Kelvin
    #[serde(alias = "bright_ti4")]
    pub brightness: f64,
    /// Fire radiative power in MW
    pub frp: f64,
    pub acq_date: String,
    /// HHMM in UTC
    #[serde(default)]
    pub acq_time: Option<u32>,
    #[serde(default)]
    pub satellite: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub daynight: Option<String>,
}
