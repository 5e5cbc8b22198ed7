//! NASA FIRMS fire hotspot client
//!
//! according to https://firms.modaps.eosdis.nasa.gov/api/area/
//!   [BASE_URL]/api/area/csv/[MAP_KEY]/[SOURCE]/[AREA_COORDINATES]/[DAY_RANGE]
//!   [BASE_URL]/api/country/csv/[MAP_KEY]/[SOURCE]/[COUNTRY_CODE]/[DAY_RANGE]
//! Day ranges count back from today.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};

use super::{FireProvider, checked_response, http_client};
use crate::config::FireConfig;
use crate::error::ProviderKind;
use crate::models::{BoundingBox, FireDetection};
use crate::{HazardError, Result};

pub struct FirmsClient {
    client: Client,
    base_url: String,
    source: String,
    map_key: Option<String>,
}

impl FirmsClient {
    pub fn new(config: &FireConfig, map_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(ProviderKind::Firms, config.timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            source: config.source.clone(),
            map_key,
        })
    }

    fn map_key(&self) -> Result<&str> {
        self.map_key.as_deref().ok_or_else(|| {
            HazardError::configuration("Set FIRMS_MAP_KEY env var to your FIRMS MAP_KEY")
        })
    }

    #[must_use]
    pub fn area_url(&self, map_key: &str, bbox: &BoundingBox, day_range: u32) -> String {
        format!(
            "{}/api/area/csv/{}/{}/{}/{}",
            self.base_url,
            map_key,
            self.source,
            bbox.to_area_coords(),
            day_range
        )
    }

    #[must_use]
    pub fn country_url(&self, map_key: &str, country_code: &str, day_range: u32) -> String {
        format!(
            "{}/api/country/csv/{}/{}/{}/{}",
            self.base_url, map_key, self.source, country_code, day_range
        )
    }

    async fn fetch_csv(&self, url: String, map_key: &str) -> Result<Vec<FireDetection>> {
        // keep the key out of the logs, it is rate limited
        debug!("FIRMS request URL: {}", url.replace(map_key, "***"));

        let started = Instant::now();
        let response =
            checked_response(ProviderKind::Firms, self.client.get(&url).send().await, started)
                .await?;
        let text = response.text().await.map_err(|e| {
            HazardError::provider(ProviderKind::Firms, format!("Failed to read FIRMS response: {e}"))
        })?;

        let detections = parse_detections(&text)?;
        info!(
            "Retrieved {} FIRMS detections in {:.3}s",
            detections.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(detections)
    }
}

#[async_trait]
impl FireProvider for FirmsClient {
    #[instrument(skip(self), fields(provider = "firms", source = %self.source))]
    async fn fetch_area(&self, bbox: &BoundingBox, day_range: u32) -> Result<Vec<FireDetection>> {
        let map_key = self.map_key()?;
        self.fetch_csv(self.area_url(map_key, bbox, day_range), map_key)
            .await
    }

    #[instrument(skip(self), fields(provider = "firms", source = %self.source))]
    async fn fetch_country(
        &self,
        country_code: &str,
        day_range: u32,
    ) -> Result<Vec<FireDetection>> {
        let map_key = self.map_key()?;
        self.fetch_csv(self.country_url(map_key, country_code, day_range), map_key)
            .await
    }
}

/// Parse the FIRMS CSV body. FIRMS reports problems such as an invalid key
/// as a plain-text body with a 200 status, so a body without a CSV header
/// is a provider error.
pub fn parse_detections(text: &str) -> Result<Vec<FireDetection>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let header = text.lines().next().unwrap_or_default();
    if !header.split(',').any(|column| column.trim() == "latitude") {
        return Err(HazardError::provider(ProviderKind::Firms, text.to_string()));
    }

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    reader
        .deserialize()
        .map(|row| {
            row.map_err(|e| {
                HazardError::provider(ProviderKind::Firms, format!("invalid FIRMS CSV row: {e}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIIRS_CSV: &str = "\
latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight
40.51,49.12,330.5,0.39,0.36,2022-01-03,1012,N,VIIRS,n,2.0NRT,290.1,4.5,D
41.02,48.77,310.5,0.41,0.37,2022-01-04,2250,N,VIIRS,h,2.0NRT,280.4,1.5,N
";

    const MODIS_CSV: &str = "\
latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight
40.51,49.12,318.2,1.0,1.0,2022-01-03,0942,T,MODIS,72,6.1NRT,295.3,12.7,D
";

    #[test]
    fn test_parse_viirs_csv() {
        let detections = parse_detections(VIIRS_CSV).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].brightness, 330.5);
        assert_eq!(detections[0].frp, 4.5);
        assert_eq!(detections[0].acq_date, "2022-01-03");
        assert_eq!(detections[0].acq_time, Some(1012));
        assert_eq!(detections[1].confidence.as_deref(), Some("h"));
    }

    #[test]
    fn test_parse_modis_csv() {
        let detections = parse_detections(MODIS_CSV).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].brightness, 318.2);
        assert_eq!(detections[0].acq_time, Some(942));
        assert_eq!(detections[0].confidence.as_deref(), Some("72"));
    }

    #[test]
    fn test_header_only_is_empty() {
        let header = VIIRS_CSV.lines().next().unwrap();
        assert!(parse_detections(header).unwrap().is_empty());
        assert!(parse_detections("").unwrap().is_empty());
    }

    #[test]
    fn test_plain_text_error_body() {
        let err = parse_detections("Invalid MAP_KEY.").unwrap_err();
        match err {
            HazardError::Provider { provider, message } => {
                assert_eq!(provider, ProviderKind::Firms);
                assert_eq!(message, "Invalid MAP_KEY.");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_urls() {
        let client = FirmsClient::new(&FireConfig::default(), Some("KEY".to_string())).unwrap();
        let bbox = BoundingBox::new(44.0, 38.5, 51.5, 42.0);
        assert_eq!(
            client.area_url("KEY", &bbox, 3),
            "https://firms.modaps.eosdis.nasa.gov/api/area/csv/KEY/VIIRS_SNPP_NRT/44,38.5,51.5,42/3"
        );
        assert_eq!(
            client.country_url("KEY", "AZE", 7),
            "https://firms.modaps.eosdis.nasa.gov/api/country/csv/KEY/VIIRS_SNPP_NRT/AZE/7"
        );
    }

    #[tokio::test]
    async fn test_missing_map_key_is_configuration_error() {
        let client = FirmsClient::new(&FireConfig::default(), None).unwrap();
        let bbox = BoundingBox::new(44.0, 38.5, 51.5, 42.0);
        let err = client.fetch_area(&bbox, 7).await.unwrap_err();
        assert!(matches!(err, HazardError::Configuration { .. }));
        assert!(err.to_string().contains("FIRMS_MAP_KEY"));
    }
}
