//! Configuration management for the hazard analytics service
//!
//! Handles loading configuration from files and environment variables,
//! resolving provider credentials, and validating all settings.

use crate::HazardError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inline Earth Engine service-account JSON
pub const EE_JSON_ENV: &str = "EE_JSON";
/// Path to an Earth Engine service-account key file
pub const EE_KEY_PATH_ENV: &str = "EE_KEY_PATH";
/// FIRMS MAP_KEY
pub const FIRMS_MAP_KEY_ENV: &str = "FIRMS_MAP_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HazardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// NASA POWER settings
    #[serde(default)]
    pub climate: ClimateConfig,
    /// CHIRPS / Earth Engine settings
    #[serde(default)]
    pub rainfall: RainfallConfig,
    /// FIRMS settings
    #[serde(default)]
    pub fire: FireConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// NASA POWER daily point API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateConfig {
    #[serde(default = "default_climate_base_url")]
    pub base_url: String,
    /// POWER user community (AG, RE or SB)
    #[serde(default = "default_climate_community")]
    pub community: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Earth Engine settings for the CHIRPS rainfall dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RainfallConfig {
    #[serde(default = "default_rainfall_base_url")]
    pub base_url: String,
    /// Cloud project to bill; taken from the key's `project_id` when unset
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default = "default_rainfall_dataset")]
    pub dataset: String,
    /// Sampling scale in meters (CHIRPS native resolution is ~5.5 km)
    #[serde(default = "default_rainfall_scale")]
    pub scale_m: f64,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Key file used when neither `EE_JSON` nor `EE_KEY_PATH` is set
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// Directories searched for a `*.json` key as a last resort
    #[serde(default = "default_key_dirs")]
    pub key_dirs: Vec<PathBuf>,
}

/// FIRMS area API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireConfig {
    #[serde(default = "default_fire_base_url")]
    pub base_url: String,
    /// MAP_KEY, overridden by `FIRMS_MAP_KEY`
    #[serde(default)]
    pub map_key: Option<String>,
    /// Dataset id, e.g. VIIRS_SNPP_NRT, VIIRS_NOAA20_NRT, MODIS_NRT
    #[serde(default = "default_fire_source")]
    pub source: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Where the Earth Engine service-account key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarthEngineCredentials {
    /// Key JSON passed directly
    Inline(String),
    /// Key JSON stored in a file
    KeyFile(PathBuf),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_climate_base_url() -> String {
    "https://power.larc.nasa.gov/api".to_string()
}

fn default_climate_community() -> String {
    "AG".to_string()
}

fn default_rainfall_base_url() -> String {
    "https://earthengine.googleapis.com/v1".to_string()
}

fn default_rainfall_dataset() -> String {
    "UCSB-CHG/CHIRPS/DAILY".to_string()
}

fn default_rainfall_scale() -> f64 {
    5566.0
}

fn default_key_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("utils/keys"), PathBuf::from("keys")]
}

fn default_fire_base_url() -> String {
    "https://firms.modaps.eosdis.nasa.gov".to_string()
}

fn default_fire_source() -> String {
    "VIIRS_SNPP_NRT".to_string()
}

fn default_timeout() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            base_url: default_climate_base_url(),
            community: default_climate_community(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for RainfallConfig {
    fn default() -> Self {
        Self {
            base_url: default_rainfall_base_url(),
            project: None,
            dataset: default_rainfall_dataset(),
            scale_m: default_rainfall_scale(),
            timeout_seconds: default_timeout(),
            key_path: None,
            key_dirs: default_key_dirs(),
        }
    }
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            base_url: default_fire_base_url(),
            map_key: None,
            source: default_fire_source(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl HazardConfig {
    /// Load configuration from `config.toml` and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path.
    ///
    /// Environment overrides use the `HAZARD_` prefix and `__` between
    /// levels, e.g. `HAZARD_FIRE__SOURCE=MODIS_NRT`.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("config.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("HAZARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: HazardConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.climate.base_url.is_empty() {
            self.climate.base_url = default_climate_base_url();
        }
        if self.climate.community.is_empty() {
            self.climate.community = default_climate_community();
        }
        if self.rainfall.base_url.is_empty() {
            self.rainfall.base_url = default_rainfall_base_url();
        }
        if self.rainfall.dataset.is_empty() {
            self.rainfall.dataset = default_rainfall_dataset();
        }
        if self.rainfall.scale_m <= 0.0 {
            self.rainfall.scale_m = default_rainfall_scale();
        }
        if self.fire.base_url.is_empty() {
            self.fire.base_url = default_fire_base_url();
        }
        if self.fire.source.is_empty() {
            self.fire.source = default_fire_source();
        }
        for timeout in [
            &mut self.climate.timeout_seconds,
            &mut self.rainfall.timeout_seconds,
            &mut self.fire.timeout_seconds,
        ] {
            if *timeout == 0 {
                *timeout = default_timeout();
            }
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        for (name, timeout) in [
            ("climate", self.climate.timeout_seconds),
            ("rainfall", self.rainfall.timeout_seconds),
            ("fire", self.fire.timeout_seconds),
        ] {
            if timeout > 600 {
                return Err(HazardError::configuration(format!(
                    "{name} timeout cannot exceed 600 seconds"
                ))
                .into());
            }
        }

        if !self.rainfall.scale_m.is_finite() {
            return Err(HazardError::configuration("rainfall scale_m must be finite").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(HazardError::configuration(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(HazardError::configuration(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("climate", &self.climate.base_url),
            ("rainfall", &self.rainfall.base_url),
            ("fire", &self.fire.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(HazardError::configuration(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Socket address string the server binds to
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl RainfallConfig {
    /// Resolve the Earth Engine key with a fixed priority:
    /// `EE_JSON`, then `EE_KEY_PATH`, then `key_path`, then the first
    /// `*.json` file found in `key_dirs`.
    pub fn resolve_credentials(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<EarthEngineCredentials> {
        if let Some(json) = env(EE_JSON_ENV).filter(|s| !s.trim().is_empty()) {
            return Some(EarthEngineCredentials::Inline(json));
        }
        if let Some(path) = env(EE_KEY_PATH_ENV).filter(|s| !s.trim().is_empty()) {
            return Some(EarthEngineCredentials::KeyFile(PathBuf::from(path)));
        }
        if let Some(path) = &self.key_path {
            return Some(EarthEngineCredentials::KeyFile(path.clone()));
        }
        self.key_dirs
            .iter()
            .find_map(|dir| first_json_file(dir))
            .map(EarthEngineCredentials::KeyFile)
    }
}

impl FireConfig {
    /// `FIRMS_MAP_KEY` wins over the configured key
    pub fn resolve_map_key(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        let not_blank = |k: &String| !k.trim().is_empty();
        env(FIRMS_MAP_KEY_ENV)
            .filter(not_blank)
            .or_else(|| self.map_key.clone().filter(not_blank))
    }
}

fn first_json_file(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files.into_iter().next()
}

/// Environment lookup backed by the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
