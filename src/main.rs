use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use hazard_analytics::config::{FIRMS_MAP_KEY_ENV, process_env};
use hazard_analytics::providers::{ChirpsClient, FirmsClient, NasaPowerClient};
use hazard_analytics::{AppState, HazardConfig, HazardService, VERSION, logging, web};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path = process_env("HAZARD_CONFIG").map(PathBuf::from);
    let config = HazardConfig::load_from_path(config_path)?;
    logging::init(&config.logging)?;

    info!("Starting hazard analytics v{VERSION}");

    let climate = NasaPowerClient::new(&config.climate)
        .context("Failed to set up NASA POWER client")?;

    let credentials = config.rainfall.resolve_credentials(process_env);
    let rainfall = ChirpsClient::new(&config.rainfall, credentials)
        .await
        .context("Failed to set up Earth Engine client")?;

    let map_key = config.fire.resolve_map_key(process_env);
    if map_key.is_none() {
        warn!("{FIRMS_MAP_KEY_ENV} is not set, fire requests will fail");
    }
    let fire = FirmsClient::new(&config.fire, map_key).context("Failed to set up FIRMS client")?;

    let service = HazardService::new(Arc::new(climate), Arc::new(rainfall), Arc::new(fire));
    let state = Arc::new(AppState::new(service));

    web::run(&config.bind_addr(), state).await
}
