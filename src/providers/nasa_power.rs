//! NASA POWER daily point API client
//!
//! See https://power.larc.nasa.gov/docs/services/api/temporal/daily/

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use super::{ClimateProvider, checked_response, http_client};
use crate::config::ClimateConfig;
use crate::error::ProviderKind;
use crate::models::TimeSeries;
use crate::reducer::{PRECTOT, T2M, WS10M};
use crate::{HazardError, Result};

/// Corrected precipitation, delivered instead of `PRECTOT` by newer API versions
pub const PRECTOTCORR: &str = "PRECTOTCORR";

/// POWER's marker for missing values
const FILL_VALUE: f64 = -999.0;

const POWER_DATE: &str = "%Y%m%d";

pub struct NasaPowerClient {
    client: Client,
    base_url: String,
    community: String,
}

/// The part of the POWER GeoJSON response we read
#[derive(Debug, Deserialize)]
pub struct PowerResponse {
    pub properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
pub struct PowerProperties {
    /// parameter name -> YYYYMMDD -> value
    pub parameter: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl NasaPowerClient {
    pub fn new(config: &ClimateConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(ProviderKind::NasaPower, config.timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            community: config.community.clone(),
        })
    }

    #[must_use]
    pub fn daily_point_url(&self) -> String {
        format!("{}/temporal/daily/point", self.base_url)
    }
}

#[async_trait]
impl ClimateProvider for NasaPowerClient {
    #[instrument(skip(self), fields(provider = "nasa_power"))]
    async fn fetch_daily(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        let started = Instant::now();
        // request PRECTOT, may get PRECTOTCORR
        let parameters = [T2M, PRECTOT, WS10M].join(",");

        let request = self.client.get(self.daily_point_url()).query(&[
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("start", start.format(POWER_DATE).to_string()),
            ("end", end.format(POWER_DATE).to_string()),
            ("parameters", parameters),
            ("community", self.community.clone()),
            ("format", "JSON".to_string()),
        ]);

        let response =
            checked_response(ProviderKind::NasaPower, request.send().await, started).await?;

        let payload: PowerResponse = response.json().await.map_err(|e| {
            HazardError::provider(
                ProviderKind::NasaPower,
                format!("Failed to parse POWER response: {e}"),
            )
        })?;

        let series = parse_power_response(payload)?;
        info!(
            "Retrieved {} POWER days in {:.3}s",
            series.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(series)
    }
}

/// Flatten the parameter map into a series, dropping fill values and
/// exposing `PRECTOTCORR` under the canonical `PRECTOT` name
pub fn parse_power_response(payload: PowerResponse) -> Result<TimeSeries> {
    let mut series = TimeSeries::new();

    for (name, values) in payload.properties.parameter {
        for (day, value) in values {
            let date = NaiveDate::parse_from_str(&day, POWER_DATE).map_err(|e| {
                HazardError::provider(
                    ProviderKind::NasaPower,
                    format!("invalid date key '{day}' for {name}: {e}"),
                )
            })?;
            match value {
                Some(v) if v != FILL_VALUE && v.is_finite() => series.insert(date, name.as_str(), v),
                _ => {}
            }
        }
    }

    if !series.has_column(PRECTOT) && series.has_column(PRECTOTCORR) {
        series.alias_column(PRECTOTCORR, PRECTOT);
    }

    Ok(series)
}
