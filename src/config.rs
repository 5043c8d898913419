// src/config.rs
use anyhow::{Context, Result};
use std::env;

/// Process configuration, read once at startup.
///
/// Only these variables are recognized; anything else in the environment is
/// ignored. `FRED_API_KEY` and `TWELVEDATA_API_KEY` are free-tier keys.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string (service credential included).
    pub database_url: String,
    /// Primary macroeconomic source key (risk-free + primary sovereign series).
    pub fred_api_key: String,
    /// FX daily-series source key.
    pub twelvedata_api_key: String,
    /// Optional demo key; the crypto source works unauthenticated at low rates.
    pub coingecko_api_key: Option<String>,
    /// Shared secret for the scheduler trigger endpoint.
    pub cron_shared_secret: String,
    /// Listen address, defaults to 0.0.0.0:8000.
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("Missing DATABASE_URL env var")?,
            fred_api_key: env::var("FRED_API_KEY").context("Missing FRED_API_KEY env var")?,
            twelvedata_api_key: env::var("TWELVEDATA_API_KEY")
                .context("Missing TWELVEDATA_API_KEY env var")?,
            coingecko_api_key: env::var("COINGECKO_API_KEY").ok(),
            cron_shared_secret: env::var("CRON_SHARED_SECRET")
                .context("Missing CRON_SHARED_SECRET env var")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        })
    }
}
