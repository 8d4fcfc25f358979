//! Configuration management for the reward engine.

/// Database configuration and connection management
pub mod database;

/// Reward policy loading from config.toml
pub mod rewards;

use crate::errors::{Error, Result};
use tracing::info;

/// Everything the engine needs at startup, resolved once.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string
    pub database_url: String,
    /// Service secret for HMAC token signatures, from `LOYALTY_SIGNING_SECRET`
    pub signing_secret: String,
    /// Reward policy from config.toml
    pub rewards: rewards::RewardsConfig,
}

/// Loads the full application configuration.
///
/// The reward policy comes from `LOYALTY_CONFIG` (default `./config.toml`);
/// the signing secret must be present in the environment because it guards
/// token issuance and is never written to disk.
pub fn load_app_configuration() -> Result<AppConfig> {
    let config_path =
        std::env::var("LOYALTY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let rewards = rewards::load_config(&config_path)?;
    info!(
        rules = rewards.rules.len(),
        tiers = rewards.tiers.len(),
        "Loaded reward policy from {config_path}"
    );

    let signing_secret = std::env::var("LOYALTY_SIGNING_SECRET").map_err(|_| Error::Config {
        message: "LOYALTY_SIGNING_SECRET must be set".to_string(),
    })?;

    Ok(AppConfig {
        database_url: database::get_database_url(),
        signing_secret,
        rewards,
    })
}
