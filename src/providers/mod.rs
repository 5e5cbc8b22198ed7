//! External data providers
//!
//! Each provider is a thin adapter over one upstream API that returns a
//! date-indexed series (or detection rows), empty when upstream has no data.
//! They sit behind traits so the service can be wired with fakes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::error::ProviderKind;
use crate::models::{BoundingBox, FireDetection, TimeSeries};
use crate::{HazardError, Result};

pub mod chirps;
pub mod firms;
pub mod nasa_power;

pub use chirps::ChirpsClient;
pub use firms::FirmsClient;
pub use nasa_power::NasaPowerClient;

const USER_AGENT: &str = concat!("HazardAnalytics/", env!("CARGO_PKG_VERSION"));

/// Upstream calls slower than this are logged as warnings
const SLOW_RESPONSE: Duration = Duration::from_secs(5);

/// Daily point climate series (temperature, precipitation, wind)
#[async_trait]
pub trait ClimateProvider: Send + Sync {
    /// Columns: `T2M`, `PRECTOT`, `WS10M`; `start` and `end` inclusive
    async fn fetch_daily(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries>;
}

/// Daily gridded rainfall sampled at a point
#[async_trait]
pub trait RainfallProvider: Send + Sync {
    /// Column: `precip_mm`; `start` inclusive, `end` exclusive
    async fn fetch_daily(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries>;
}

/// Fire hotspot detections over a trailing day window
#[async_trait]
pub trait FireProvider: Send + Sync {
    async fn fetch_area(&self, bbox: &BoundingBox, day_range: u32) -> Result<Vec<FireDetection>>;

    /// `country_code` is ISO 3166-1 alpha-3
    async fn fetch_country(&self, country_code: &str, day_range: u32)
    -> Result<Vec<FireDetection>>;
}

/// Shared reqwest client setup for all providers
pub(crate) fn http_client(provider: ProviderKind, timeout_seconds: u32) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| {
            HazardError::configuration(format!("Failed to create HTTP client for {provider}: {e}"))
        })
}

/// Turn transport errors and non-2xx statuses into provider errors,
/// embedding the upstream body so the caller sees the original message
pub(crate) async fn checked_response(
    provider: ProviderKind,
    result: reqwest::Result<Response>,
    started: Instant,
) -> Result<Response> {
    let response = result
        .map_err(|e| HazardError::provider(provider, format!("request failed: {e}")))?;

    let elapsed = started.elapsed();
    let status = response.status();
    debug!(%provider, %status, "response in {:.3}s", elapsed.as_secs_f64());
    if elapsed > SLOW_RESPONSE {
        warn!(%provider, "Slow API response detected: {:.3}s", elapsed.as_secs_f64());
    }

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(HazardError::provider(
        provider,
        format!("HTTP {status}: {}", body.trim()),
    ))
}
