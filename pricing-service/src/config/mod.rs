//! Configuration module for pricing-service.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

use crate::services::StayDefaults;

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// `None` runs the service on the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub stay_defaults: StayDefaults,
    /// Longest stay `/quotes` will price night by night.
    pub max_quote_nights: i64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl PricingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let database = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 2),
            });

        let stay_defaults = StayDefaults::new(
            env_or("DEFAULT_MIN_NIGHTS", 1),
            env_or("DEFAULT_MAX_NIGHTS", 28),
        )?;

        let max_quote_nights = env_or("MAX_QUOTE_NIGHTS", 366);
        if max_quote_nights < 1 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MAX_QUOTE_NIGHTS must be at least 1"
            )));
        }

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "pricing-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database,
            stay_defaults,
            max_quote_nights,
        })
    }
}
