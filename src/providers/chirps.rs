//! CHIRPS daily rainfall through the Earth Engine REST API
//!
//! A single `value:compute` call evaluates `ImageCollection.getRegion` over
//! the dataset filtered to the date range, sampled at the point. The result
//! is a table whose first row is the header (`id, longitude, latitude, time,
//! precipitation`).

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey, authenticator::DefaultAuthenticator};

use super::{RainfallProvider, checked_response, http_client};
use crate::config::{EarthEngineCredentials, RainfallConfig};
use crate::error::ProviderKind;
use crate::models::{ISO_DATE, TimeSeries};
use crate::reducer::PRECIP_MM;
use crate::{HazardError, Result};

pub const EARTH_ENGINE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/earthengine",
    "https://www.googleapis.com/auth/cloud-platform",
];

/// Band holding daily precipitation in mm
const PRECIPITATION_BAND: &str = "precipitation";

const MISSING_CREDENTIALS: &str =
    "Could not find Earth Engine credentials (EE_JSON, EE_KEY_PATH, or local key file)";

pub struct ChirpsClient {
    client: Client,
    config: RainfallConfig,
    /// Why Earth Engine is unusable when initialization failed
    auth: std::result::Result<EarthEngineAuth, String>,
}

struct EarthEngineAuth {
    authenticator: DefaultAuthenticator,
    project: String,
}

#[derive(Debug, Deserialize)]
pub struct ComputeValueResponse {
    #[serde(default)]
    pub result: Value,
}

impl ChirpsClient {
    /// Build the client. Missing or unusable credentials do not fail
    /// construction; every fetch then fails with a configuration error.
    pub async fn new(
        config: &RainfallConfig,
        credentials: Option<EarthEngineCredentials>,
    ) -> Result<Self> {
        let client = http_client(ProviderKind::Chirps, config.timeout_seconds)?;

        let auth = match credentials {
            Some(credentials) => EarthEngineAuth::new(config, credentials).await,
            None => Err(MISSING_CREDENTIALS.to_string()),
        };
        if let Err(reason) = &auth {
            warn!("Earth Engine unavailable, rainfall requests will fail: {reason}");
        }

        Ok(Self {
            client,
            config: config.clone(),
            auth,
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.auth.is_ok()
    }

    fn compute_url(&self, project: &str) -> String {
        format!(
            "{}/projects/{}/value:compute",
            self.config.base_url.trim_end_matches('/'),
            project
        )
    }

    fn compute_request(
        &self,
        project: &str,
        token: &str,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RequestBuilder {
        let body = region_expression(&self.config.dataset, lat, lon, start, end, self.config.scale_m);
        self.client
            .post(self.compute_url(project))
            .bearer_auth(token)
            .json(&body)
    }
}

impl EarthEngineAuth {
    async fn new(
        config: &RainfallConfig,
        credentials: EarthEngineCredentials,
    ) -> std::result::Result<Self, String> {
        let key: ServiceAccountKey = match &credentials {
            EarthEngineCredentials::Inline(json) => yup_oauth2::parse_service_account_key(json)
                .map_err(|e| format!("EE_JSON is not a service account key: {e}"))?,
            EarthEngineCredentials::KeyFile(path) => yup_oauth2::read_service_account_key(path)
                .await
                .map_err(|e| format!("Failed to read Earth Engine key {}: {e}", path.display()))?,
        };

        let project = config
            .project
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or("Earth Engine project is neither configured nor present in the key")?;

        info!(client_email = %key.client_email, %project, "Earth Engine credentials loaded");

        let authenticator = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| format!("Failed to build Earth Engine authenticator: {e}"))?;

        Ok(Self {
            authenticator,
            project,
        })
    }

    async fn bearer_token(&self) -> Result<String> {
        let token = self
            .authenticator
            .token(&EARTH_ENGINE_SCOPES[..])
            .await
            .map_err(|e| HazardError::provider(ProviderKind::Chirps, format!("token request failed: {e}")))?;

        token.token().map(str::to_string).ok_or_else(|| {
            HazardError::provider(ProviderKind::Chirps, "token response without access token")
        })
    }
}

#[async_trait]
impl RainfallProvider for ChirpsClient {
    #[instrument(skip(self), fields(provider = "chirps"))]
    async fn fetch_daily(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        let auth = self
            .auth
            .as_ref()
            .map_err(|reason| HazardError::configuration(reason.clone()))?;

        let started = Instant::now();
        let token = auth.bearer_token().await?;
        let request = self.compute_request(&auth.project, &token, lat, lon, start, end);

        let response =
            checked_response(ProviderKind::Chirps, request.send().await, started).await?;

        let payload: ComputeValueResponse = response.json().await.map_err(|e| {
            HazardError::provider(
                ProviderKind::Chirps,
                format!("Failed to parse Earth Engine response: {e}"),
            )
        })?;

        let series = parse_region_table(&payload.result)?;
        if series.is_empty() {
            info!("No CHIRPS imagery between {start} and {end}");
        } else {
            info!(
                "Retrieved {} CHIRPS days in {:.3}s",
                series.len(),
                started.elapsed().as_secs_f64()
            );
        }
        Ok(series)
    }
}

fn invoke(function_name: &str, arguments: Value) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": function_name,
            "arguments": arguments,
        }
    })
}

fn constant(value: impl Into<Value>) -> Value {
    json!({ "constantValue": value.into() })
}

/// Earth Engine expression graph: the dataset filtered to `[start, end)`
/// and sampled at `(lon, lat)` with `getRegion`
#[must_use]
pub fn region_expression(
    dataset: &str,
    lat: f64,
    lon: f64,
    start: NaiveDate,
    end: NaiveDate,
    scale_m: f64,
) -> Value {
    let collection = invoke(
        "Collection.filter",
        json!({
            "collection": invoke("ImageCollection.load", json!({ "id": constant(dataset) })),
            "filter": invoke(
                "Filter.dateRangeContains",
                json!({
                    "leftValue": invoke(
                        "DateRange",
                        json!({
                            "start": constant(start.format(ISO_DATE).to_string()),
                            "end": constant(end.format(ISO_DATE).to_string()),
                        }),
                    ),
                    "rightField": constant("system:time_start"),
                }),
            ),
        }),
    );

    let point = invoke(
        "GeometryConstructors.Point",
        json!({ "coordinates": constant(vec![lon, lat]) }),
    );

    json!({
        "expression": {
            "result": "0",
            "values": {
                "0": invoke(
                    "ImageCollection.getRegion",
                    json!({
                        "collection": collection,
                        "geometry": point,
                        "scale": constant(scale_m),
                    }),
                ),
            },
        }
    })
}

/// Read the `getRegion` table into a `precip_mm` series. Rows with a null
/// precipitation value are skipped; a header-only table is an empty series.
pub fn parse_region_table(result: &Value) -> Result<TimeSeries> {
    let malformed =
        |msg: &str| HazardError::provider(ProviderKind::Chirps, format!("malformed getRegion table: {msg}"));

    let mut series = TimeSeries::new();
    let rows = match result {
        Value::Null => return Ok(series),
        Value::Array(rows) => rows,
        _ => return Err(malformed("result is not an array")),
    };

    let Some((header, data)) = rows.split_first() else {
        return Ok(series);
    };
    let header = header.as_array().ok_or_else(|| malformed("header is not an array"))?;
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.as_str() == Some(name))
            .ok_or_else(|| malformed(&format!("missing '{name}' column")))
    };
    let time_idx = column("time")?;
    let precip_idx = column(PRECIPITATION_BAND)?;

    for row in data {
        let row = row.as_array().ok_or_else(|| malformed("row is not an array"))?;
        let millis = row
            .get(time_idx)
            .and_then(Value::as_f64)
            .ok_or_else(|| malformed("row without time"))?;
        let Some(value) = row.get(precip_idx).and_then(Value::as_f64) else {
            continue;
        };
        let date = DateTime::<Utc>::from_timestamp_millis(millis as i64)
            .ok_or_else(|| malformed("time out of range"))?
            .date_naive();
        series.insert(date, PRECIP_MM, value);
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, d).unwrap()
    }

    #[test]
    fn test_region_expression_shape() {
        let expr = region_expression("UCSB-CHG/CHIRPS/DAILY", 40.4093, 49.8671, date(1), date(10), 5566.0);
        let root = &expr["expression"]["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "ImageCollection.getRegion");

        let coords = &root["arguments"]["geometry"]["functionInvocationValue"]["arguments"]["coordinates"]["constantValue"];
        assert_eq!(coords, &json!([49.8671, 40.4093]));

        let filter = &root["arguments"]["collection"]["functionInvocationValue"]["arguments"]["filter"];
        let range = &filter["functionInvocationValue"]["arguments"]["leftValue"]["functionInvocationValue"]["arguments"];
        assert_eq!(range["start"]["constantValue"], "2022-01-01");
        assert_eq!(range["end"]["constantValue"], "2022-01-10");
    }

    #[test]
    fn test_parse_region_table() {
        let result = json!([
            ["id", "longitude", "latitude", "time", "precipitation"],
            ["20220102", 49.87, 40.41, 1_641_081_600_000_i64, 2.5],
            ["20220101", 49.87, 40.41, 1_640_995_200_000_i64, 0.0],
            ["20220103", 49.87, 40.41, 1_641_168_000_000_i64, null]
        ]);
        let series = parse_region_table(&result).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(&date(1), PRECIP_MM), Some(0.0));
        assert_eq!(series.get(&date(2), PRECIP_MM), Some(2.5));
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let result = json!([["id", "longitude", "latitude", "time", "precipitation"]]);
        assert!(parse_region_table(&result).unwrap().is_empty());
        assert!(parse_region_table(&Value::Null).unwrap().is_empty());
        assert!(parse_region_table(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_missing_band_is_provider_error() {
        let result = json!([["id", "time", "other"], ["x", 0, 1.0]]);
        let err = parse_region_table(&result).unwrap_err();
        assert!(matches!(
            err,
            HazardError::Provider {
                provider: ProviderKind::Chirps,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_client_reports_configuration_error() {
        let client = ChirpsClient::new(&RainfallConfig::default(), None).await.unwrap();
        assert!(!client.is_configured());
        let err = client
            .fetch_daily(40.0, 49.0, date(1), date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, HazardError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_invalid_inline_key_keeps_client_unconfigured() {
        let client = ChirpsClient::new(
            &RainfallConfig::default(),
            Some(EarthEngineCredentials::Inline("not json".to_string())),
        )
        .await
        .unwrap();
        assert!(!client.is_configured());

        let err = client
            .fetch_daily(40.0, 49.0, date(1), date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, HazardError::Configuration { .. }));
        assert!(err.to_string().contains("EE_JSON"), "{err}");
    }

    #[tokio::test]
    async fn test_non_key_json_in_key_dir_still_builds_client() {
        let dir = std::env::temp_dir().join(format!("hazard-chirps-keys-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), r#"{"name":"x"}"#).unwrap();

        let config = RainfallConfig {
            key_dirs: vec![dir.clone()],
            ..RainfallConfig::default()
        };
        let credentials = config.resolve_credentials(|_| None);
        assert_eq!(
            credentials,
            Some(EarthEngineCredentials::KeyFile(dir.join("package.json")))
        );

        let client = ChirpsClient::new(&config, credentials).await.unwrap();
        assert!(!client.is_configured());

        let err = client
            .fetch_daily(40.0, 49.0, date(1), date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, HazardError::Configuration { .. }));
        assert!(err.to_string().contains("package.json"), "{err}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_compute_request_posts_expression_with_bearer() {
        let client = ChirpsClient::new(&RainfallConfig::default(), None).await.unwrap();
        let request = client
            .compute_request("my-project", "tok123", 40.4093, 49.8671, date(1), date(10))
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://earthengine.googleapis.com/v1/projects/my-project/value:compute"
        );
        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer tok123"
        );

        let body: Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(
            body,
            region_expression("UCSB-CHG/CHIRPS/DAILY", 40.4093, 49.8671, date(1), date(10), 5566.0)
        );
    }
}
