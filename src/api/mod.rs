use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Json,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{
    BoundingBox, Coverage, FeatureUnits, FireDetection, HazardFeatures, LocationPayload,
    NormalizedLocation, TimeSeriesRecord,
};
use crate::reducer::{CLIMATE_FIELDS, PRECIP_MM};
use crate::service::{DEFAULT_FIRMS_DAYS, DateWindow, HazardService, validate_firms_days};
use crate::{HazardError, Result};

/// Shared, read-only state handed to every handler
pub struct AppState {
    pub service: HazardService,
    pub units: FeatureUnits,
}

impl AppState {
    #[must_use]
    pub fn new(service: HazardService) -> Self {
        Self {
            service,
            units: FeatureUnits::standard(),
        }
    }
}

fn default_firms_days() -> u32 {
    DEFAULT_FIRMS_DAYS
}

/// Body of the compute and raw endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardRequest {
    #[serde(flatten)]
    pub location: LocationPayload,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default = "default_firms_days")]
    pub firms_days: u32,
}

struct ValidatedRequest {
    location: NormalizedLocation,
    window: DateWindow,
    firms_days: u32,
}

impl HazardRequest {
    fn validate(self) -> Result<ValidatedRequest> {
        let window = DateWindow::new(self.start, self.end)?;
        let firms_days = validate_firms_days(self.firms_days)?;
        let location = self.location.normalize()?;
        Ok(ValidatedRequest {
            location,
            window,
            firms_days,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HazardFeaturesResponse {
    pub location: NormalizedLocation,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub firms_days: u32,
    pub bbox: BoundingBox,
    pub features: HazardFeatures,
    pub units: FeatureUnits,
    pub coverage: Coverage,
}

#[derive(Debug, Serialize)]
pub struct RawHazardResponse {
    pub location: NormalizedLocation,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub firms_days: u32,
    pub climate: Vec<TimeSeriesRecord>,
    pub rainfall: Vec<TimeSeriesRecord>,
    pub fires: Vec<FireDetection>,
}

#[derive(Debug, Deserialize)]
pub struct CountryFiresQuery {
    #[serde(default = "default_firms_days")]
    pub days: u32,
}

#[derive(Debug, Serialize)]
pub struct CountryFiresResponse {
    pub country: String,
    pub days: u32,
    pub count: usize,
    pub fires: Vec<FireDetection>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/units", get(units))
        .route("/locations/preview", post(preview_location))
        .route("/hazards/compute", post(compute_features))
        .route("/hazard-features", post(compute_features))
        .route("/compute", post(compute_features))
        .route("/hazards/raw", post(raw_hazards))
        .route("/fires/country/{iso3}", get(country_fires))
        .with_state(state)
}

/// Map axum's body rejections onto the service error body
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| HazardError::validation(rejection.body_text()))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn units(State(state): State<Arc<AppState>>) -> Json<FeatureUnits> {
    Json(state.units.clone())
}

async fn preview_location(
    payload: std::result::Result<Json<LocationPayload>, JsonRejection>,
) -> Result<Json<NormalizedLocation>> {
    let location = json_body(payload)?.normalize()?;
    Ok(Json(location))
}

async fn compute_features(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<HazardRequest>, JsonRejection>,
) -> Result<Json<HazardFeaturesResponse>> {
    let request = json_body(payload)?.validate()?;
    let report = state
        .service
        .compute(&request.location, request.window, request.firms_days)
        .await?;

    Ok(Json(HazardFeaturesResponse {
        location: request.location,
        start: request.window.start,
        end: request.window.end,
        firms_days: request.firms_days,
        bbox: request.location.bbox,
        features: report.features,
        units: state.units.clone(),
        coverage: report.coverage,
    }))
}

async fn raw_hazards(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<HazardRequest>, JsonRejection>,
) -> Result<Json<RawHazardResponse>> {
    let request = json_body(payload)?.validate()?;
    let raw = state
        .service
        .fetch_raw(&request.location, request.window, request.firms_days)
        .await?;

    Ok(Json(RawHazardResponse {
        location: request.location,
        start: request.window.start,
        end: request.window.end,
        firms_days: request.firms_days,
        climate: raw.climate.to_records(&CLIMATE_FIELDS),
        rainfall: raw.rainfall.to_records(&[PRECIP_MM]),
        fires: raw.fires,
    }))
}

async fn country_fires(
    State(state): State<Arc<AppState>>,
    Path(iso3): Path<String>,
    query: std::result::Result<Query<CountryFiresQuery>, QueryRejection>,
) -> Result<Json<CountryFiresResponse>> {
    let Query(query) = query.map_err(|rejection| HazardError::validation(rejection.body_text()))?;
    let fires = state.service.country_fires(&iso3, query.days).await?;

    Ok(Json(CountryFiresResponse {
        country: iso3.trim().to_ascii_uppercase(),
        days: query.days,
        count: fires.len(),
        fires,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_firms_days() {
        let request: HazardRequest = serde_json::from_str(
            r#"{"point": [40.4093, 49.8671], "start": "2022-01-01", "end": "2022-01-10"}"#,
        )
        .unwrap();
        assert_eq!(request.firms_days, DEFAULT_FIRMS_DAYS);
        assert_eq!(request.location, LocationPayload::point(40.4093, 49.8671));
    }

    #[test]
    fn test_request_with_bbox() {
        let request: HazardRequest = serde_json::from_str(
            r#"{"bbox": [44, 38.5, 51.5, 42], "start": "2022-01-01", "end": "2022-01-10", "firms_days": 3}"#,
        )
        .unwrap();
        assert_eq!(
            request.location.bbox,
            Some(BoundingBox::new(44.0, 38.5, 51.5, 42.0))
        );
        assert_eq!(request.firms_days, 3);
    }

    #[test]
    fn test_validate_rejects_inverted_dates() {
        let request: HazardRequest = serde_json::from_str(
            r#"{"point": [40.0, 49.0], "start": "2022-01-10", "end": "2022-01-01"}"#,
        )
        .unwrap();
        assert!(matches!(
            request.validate(),
            Err(HazardError::Validation { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_firms_days_out_of_range() {
        let request: HazardRequest = serde_json::from_str(
            r#"{"point": [40.0, 49.0], "start": "2022-01-01", "end": "2022-01-02", "firms_days": 0}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }
}
