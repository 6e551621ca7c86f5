pub mod cli;
pub mod config;
pub mod core;
pub mod providers;
pub mod rate_client;
pub mod scheduler;

use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Rates,
    Watch,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Rate tracker starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let client = providers::exchange_rate_api::ExchangeRateApiClient::new(
        &config.provider.base_url,
        &config.api_key(),
        config.request_timeout(),
    );
    let scheduler = scheduler::RefreshScheduler::new(client, &config.base_currency);

    match command {
        AppCommand::Rates => cli::rates::run(&scheduler, &config.display_currencies).await,
        AppCommand::Watch => cli::watch::run(&scheduler, &config.display_currencies).await,
    }
}
