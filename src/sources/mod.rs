//! # Source Adapters
//! One adapter per data provider. Every adapter owns exactly one provider
//! call, enforces an explicit timeout, and never propagates an error to the
//! caller: the public methods return `Option`/typed results and log failure
//! detail. A missing value downstream means a missing metric, never a crash.

pub mod crypto;
pub mod fred;
pub mod fx;
pub mod imf;
pub mod inflation;
pub mod reserves;
pub mod sovereign;
pub mod stablecoin;

use std::time::Duration;

use anyhow::Result;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use reqwest::Client;

use crate::config::Config;

/// Default timeout for free-tier providers.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
/// Bulk history pulls during backfill get more headroom.
pub const BACKFILL_TIMEOUT: Duration = Duration::from_secs(30);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_fetch_errors_total",
            "Adapter fetch/parse failures, labeled by source."
        );
        describe_counter!("source_fetch_total", "Adapter fetches attempted, labeled by source.");
    });
}

/// Shared client for daily fetches.
pub fn build_client() -> Client {
    client_with_timeout(FETCH_TIMEOUT)
}

/// Client for backfill history pulls.
pub fn build_backfill_client() -> Client {
    client_with_timeout(BACKFILL_TIMEOUT)
}

fn client_with_timeout(timeout: Duration) -> Client {
    Client::builder()
        .user_agent("macro-stress/0.4")
        .timeout(timeout)
        .build()
        .expect("reqwest client")
}

/// Flatten an adapter's inner result into an `Option`, logging and counting
/// the failure. This is the single place the never-throws contract lives.
pub(crate) fn swallow<T>(source: &'static str, res: Result<T>) -> Option<T> {
    ensure_metrics_described();
    counter!("source_fetch_total", "source" => source).increment(1);
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(source, error = format!("{e:#}"), "source fetch failed");
            counter!("source_fetch_errors_total", "source" => source).increment(1);
            None
        }
    }
}

/// Every provider adapter the pipeline talks to, bundled for injection.
pub struct Sources {
    pub fx: fx::TwelveData,
    pub parallel: fx::Bluelytics,
    pub crypto: crypto::CoinGecko,
    pub inflation: inflation::WorldBank,
    pub fred: fred::FredSeries,
    pub imf: imf::ImfSdmx,
    pub stablecoin: stablecoin::Criptoya,
}

impl Sources {
    pub fn from_config(cfg: &Config, client: Client) -> Self {
        Self {
            fx: fx::TwelveData::new(client.clone(), cfg.twelvedata_api_key.clone()),
            parallel: fx::Bluelytics::new(client.clone()),
            crypto: crypto::CoinGecko::new(client.clone(), cfg.coingecko_api_key.clone()),
            inflation: inflation::WorldBank::new(client.clone()),
            fred: fred::FredSeries::new(client.clone(), cfg.fred_api_key.clone()),
            imf: imf::ImfSdmx::new(client.clone()),
            stablecoin: stablecoin::Criptoya::new(client),
        }
    }
}
