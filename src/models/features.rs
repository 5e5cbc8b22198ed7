//! Hazard feature summaries and their unit table

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

/// Climate summary from the daily point reanalysis series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateFeatures {
    pub t2m_mean: f64,
    pub t2m_max: f64,
    pub precip_sum: f64,
    pub wind_mean: f64,
}

/// Rainfall summary from the satellite precipitation series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DroughtFeatures {
    pub chirps_precip_sum: f64,
    pub chirps_precip_mean: f64,
}

/// Fire hotspot summary over the bbox and lookback window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FireFeatures {
    pub fires_count: u64,
    pub fires_mean_brightness: f64,
    pub fires_mean_frp: f64,
}

/// All hazard features for one location and time window.
///
/// `fire` is `None` when no bbox was available and serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HazardFeatures {
    pub climate: ClimateFeatures,
    pub drought: DroughtFeatures,
    #[serde(serialize_with = "fire_or_empty")]
    pub fire: Option<FireFeatures>,
}

fn fire_or_empty<S: Serializer>(fire: &Option<FireFeatures>, s: S) -> Result<S::Ok, S::Error> {
    match fire {
        Some(f) => f.serialize(s),
        None => BTreeMap::<String, f64>::new().serialize(s),
    }
}

/// Number of rows each provider returned; zero means the provider had no data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub climate_days: usize,
    pub rainfall_days: usize,
    pub fire_detections: usize,
}

/// category -> field -> unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureUnits(pub BTreeMap<String, BTreeMap<String, String>>);

impl FeatureUnits {
    /// The fixed unit table of the features this service computes
    #[must_use]
    pub fn standard() -> Self {
        let table: [(&str, &[(&str, &str)]); 3] = [
            (
                "climate",
                &[
                    ("t2m_mean", "degC"),
                    ("t2m_max", "degC"),
                    ("precip_sum", "mm"),
                    ("wind_mean", "m/s"),
                ],
            ),
            (
                "drought",
                &[("chirps_precip_sum", "mm"), ("chirps_precip_mean", "mm/day")],
            ),
            (
                "fire",
                &[
                    ("fires_count", "count"),
                    ("fires_mean_brightness", "Kelvin"),
                    ("fires_mean_frp", "MW"),
                ],
            ),
        ];

        Self(
            table
                .iter()
                .map(|(category, fields)| {
                    let fields = fields
                        .iter()
                        .map(|(f, u)| ((*f).to_string(), (*u).to_string()))
                        .collect();
                    ((*category).to_string(), fields)
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn unit(&self, category: &str, field: &str) -> Option<&str> {
        self.0.get(category)?.get(field).map(String::as_str)
    }
}

impl Default for FeatureUnits {
    fn default() -> Self {
        Self::standard()
    }
}
