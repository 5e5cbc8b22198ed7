//! Tracing subscriber setup

use anyhow::{Result, anyhow, bail};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human readable output
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn parse(format: &str) -> Result<Self> {
        match format {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => bail!("Unknown log format '{other}'"),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let format = LogFormat::parse(&config.format)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow!("Invalid log filter '{}': {e}", config.level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
