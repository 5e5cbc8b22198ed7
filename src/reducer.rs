//! Reduces provider series into hazard features.
//!
//! No statistic fails on empty input: an absent column, an empty series or a
//! non-finite result all yield zero, so "no data" and "measured zero" look
//! the same in the output. Use [`Coverage`] to tell them apart.

use crate::models::{
    BoundingBox, ClimateFeatures, Coverage, DroughtFeatures, FireDetection, FireFeatures,
    HazardFeatures, TimeSeries,
};

/// Temperature at 2 m, degC
pub const T2M: &str = "T2M";
/// Total precipitation, mm/day; also delivered as `PRECTOTCORR`
pub const PRECTOT: &str = "PRECTOT";
/// Wind speed at 10 m, m/s
pub const WS10M: &str = "WS10M";
/// Satellite precipitation, mm/day
pub const PRECIP_MM: &str = "precip_mm";

/// Climate columns, in the order the raw endpoint reports them
pub const CLIMATE_FIELDS: [&str; 3] = [T2M, PRECTOT, WS10M];

fn safe_sum(values: &[f64]) -> f64 {
    finite_or_zero(values.iter().sum())
}

fn safe_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(values.iter().sum::<f64>() / values.len() as f64)
}

fn safe_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
        .unwrap_or(0.0)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[must_use]
pub fn climate_features(series: &TimeSeries) -> ClimateFeatures {
    let t2m = series.column(T2M);
    ClimateFeatures {
        t2m_mean: safe_mean(&t2m),
        t2m_max: safe_max(&t2m),
        precip_sum: safe_sum(&series.column(PRECTOT)),
        wind_mean: safe_mean(&series.column(WS10M)),
    }
}

#[must_use]
pub fn drought_features(series: &TimeSeries) -> DroughtFeatures {
    let precip = series.column(PRECIP_MM);
    DroughtFeatures {
        chirps_precip_sum: safe_sum(&precip),
        chirps_precip_mean: safe_mean(&precip),
    }
}

#[must_use]
pub fn fire_features(detections: &[FireDetection]) -> FireFeatures {
    let brightness: Vec<f64> = detections.iter().map(|d| d.brightness).collect();
    let frp: Vec<f64> = detections.iter().map(|d| d.frp).collect();
    FireFeatures {
        fires_count: detections.len() as u64,
        fires_mean_brightness: safe_mean(&brightness),
        fires_mean_frp: safe_mean(&frp),
    }
}

/// Build the full feature set. Fire statistics are only produced when a
/// bbox was supplied; without one the fire mapping stays empty.
#[must_use]
pub fn build_hazard_features(
    climate: &TimeSeries,
    rainfall: &TimeSeries,
    fires: &[FireDetection],
    bbox: Option<&BoundingBox>,
) -> HazardFeatures {
    HazardFeatures {
        climate: climate_features(climate),
        drought: drought_features(rainfall),
        fire: bbox.map(|_| fire_features(fires)),
    }
}

#[must_use]
pub fn coverage(climate: &TimeSeries, rainfall: &TimeSeries, fires: &[FireDetection]) -> Coverage {
    Coverage {
        climate_days: climate.len(),
        rainfall_days: rainfall.len(),
        fire_detections: fires.len(),
    }
}
