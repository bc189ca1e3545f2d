//! Configuration management for the settlement coordinator server.
//!
//! This module provides configuration loading from both base configuration file
//! and environment variables. Environment variables override the base configuration
//! and use the prefix `SETTLEMENT_`.

use core::time::Duration;

use config::{ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Loads the application configuration from base config and environment variables.
///
/// Environment variables use double underscores `__` to denote nested keys.
/// For example, `SETTLEMENT_APP__LISTEN` corresponds to `app.listen`.
///
/// # Errors
///
/// If the configuration could not be loaded or parsed
pub fn get_configuration() -> Result<Config, ConfigError> {
    config::Config::builder()
        .add_source(File::from_str(include_str!("base_config.ron"), FileFormat::Ron))
        .add_source(
            Environment::with_prefix(Config::CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

/// Root configuration structure containing all application settings.
#[derive(Deserialize)]
pub struct Config {
    /// Application-specific configuration
    pub app: AppConfig,

    /// Risk gate tuning
    pub risk: RiskConfig,

    /// External collaborator endpoints
    pub collaborators: CollaboratorsConfig,
}

/// Application-specific configuration settings.
#[derive(Deserialize)]
pub struct AppConfig {
    /// The address to listen on (e.g., "0.0.0.0:59159")
    pub listen: String,

    /// CORS allowed origins (e.g., ["http://localhost:3000", "https://example.com"])
    /// Use ["*"] to allow all origins
    pub cors_allowed_origins: Vec<String>,
}

/// Risk gate configuration settings.
#[derive(Deserialize)]
pub struct RiskConfig {
    /// Normalized fraud-risk scores at or above this value block money-moving
    /// actions
    pub block_threshold: f64,

    /// The scale the fraud oracle reports raw scores in: "unit" for
    /// `0.0..=1.0`, "percent" for `0.0..=100.0`
    pub score_scale: String,
}

/// External collaborator endpoint settings.
#[derive(Deserialize)]
pub struct CollaboratorsConfig {
    /// Base URL of the fraud scoring service
    pub fraud_oracle_url: String,

    /// Base URL of the payment gateway
    pub payment_gateway_url: String,

    /// Base URL of the notification service
    pub notification_url: String,

    /// Request timeout for collaborator calls
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Config {
    const CONFIG_ENV_PREFIX: &str = "SETTLEMENT";
}
