//! Hazard feature service: fans out to the providers and reduces the results

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::models::{Coverage, FireDetection, HazardFeatures, NormalizedLocation, TimeSeries};
use crate::providers::{ClimateProvider, FireProvider, RainfallProvider};
use crate::reducer;
use crate::{HazardError, Result};

/// Default fire lookback in days
pub const DEFAULT_FIRMS_DAYS: u32 = 7;
/// Longest accepted fire lookback in days
pub const MAX_FIRMS_DAYS: u32 = 365;

/// Inclusive date range of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(HazardError::validation(format!(
                "start ({start}) must not be after end ({end})"
            )));
        }
        Ok(Self { start, end })
    }
}

pub fn validate_firms_days(days: u32) -> Result<u32> {
    if (1..=MAX_FIRMS_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(HazardError::validation(format!(
            "firms_days must be between 1 and {MAX_FIRMS_DAYS}, got {days}"
        )))
    }
}

/// ISO 3166-1 alpha-3, upper-cased
pub fn validate_country_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(HazardError::validation(format!(
            "country code must be a 3-letter ISO code, got '{code}'"
        )))
    }
}

/// Unreduced provider output for one request
#[derive(Debug, Clone, Default)]
pub struct RawHazardData {
    pub climate: TimeSeries,
    pub rainfall: TimeSeries,
    pub fires: Vec<FireDetection>,
}

/// Reduced features plus how much data each provider returned
#[derive(Debug, Clone)]
pub struct HazardReport {
    pub features: HazardFeatures,
    pub coverage: Coverage,
}

#[derive(Clone)]
pub struct HazardService {
    climate: Arc<dyn ClimateProvider>,
    rainfall: Arc<dyn RainfallProvider>,
    fire: Arc<dyn FireProvider>,
}

impl HazardService {
    pub fn new(
        climate: Arc<dyn ClimateProvider>,
        rainfall: Arc<dyn RainfallProvider>,
        fire: Arc<dyn FireProvider>,
    ) -> Self {
        Self {
            climate,
            rainfall,
            fire,
        }
    }

    /// Query all three providers concurrently. The first failure aborts the
    /// others; there is no partial result.
    #[instrument(skip(self), fields(lat = location.lat, lon = location.lon))]
    pub async fn fetch_raw(
        &self,
        location: &NormalizedLocation,
        window: DateWindow,
        firms_days: u32,
    ) -> Result<RawHazardData> {
        let started = Instant::now();

        let (climate, rainfall, fires) = tokio::try_join!(
            self.climate
                .fetch_daily(location.lat, location.lon, window.start, window.end),
            self.rainfall
                .fetch_daily(location.lat, location.lon, window.start, window.end),
            self.fire.fetch_area(&location.bbox, firms_days),
        )?;

        info!(
            climate_days = climate.len(),
            rainfall_days = rainfall.len(),
            fire_detections = fires.len(),
            "Fetched provider data in {:.3}s",
            started.elapsed().as_secs_f64()
        );

        Ok(RawHazardData {
            climate,
            rainfall,
            fires,
        })
    }

    pub async fn compute(
        &self,
        location: &NormalizedLocation,
        window: DateWindow,
        firms_days: u32,
    ) -> Result<HazardReport> {
        let raw = self.fetch_raw(location, window, firms_days).await?;
        Ok(HazardReport {
            features: reducer::build_hazard_features(
                &raw.climate,
                &raw.rainfall,
                &raw.fires,
                Some(&location.bbox),
            ),
            coverage: reducer::coverage(&raw.climate, &raw.rainfall, &raw.fires),
        })
    }

    pub async fn country_fires(&self, country_code: &str, days: u32) -> Result<Vec<FireDetection>> {
        let code = validate_country_code(country_code)?;
        let days = validate_firms_days(days)?;
        self.fire.fetch_country(&code, days).await
    }
}
