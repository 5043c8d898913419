// src/sources/crypto.rs
use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

use super::swallow;

/// Global crypto market-cap provider (CoinGecko). The scored metric is the
/// stablecoin-over-BTC market-cap ratio, identical for every country on a
/// given date.
pub struct CoinGecko {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    market_cap: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    market_caps: Vec<(i64, f64)>,
}

impl CoinGecko {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: "https://api.coingecko.com".to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Current `(USDT + USDC) / BTC` market-cap ratio, rounded to 4 decimals.
    /// USDT and BTC are required; USDC is optional.
    pub async fn stablecoin_btc_ratio(&self) -> Option<f64> {
        swallow("crypto_ratio", self.fetch_ratio().await)
    }

    async fn fetch_ratio(&self) -> Result<f64> {
        let url = format!(
            "{}/api/v3/coins/markets?vs_currency=usd&ids=bitcoin,tether,usd-coin",
            self.base_url
        );
        let rows: Vec<MarketRow> = self
            .request(&url)
            .await
            .context("crypto market caps request")?;

        let cap = |coin: &str| -> Option<f64> {
            rows.iter()
                .find(|r| r.id == coin)
                .and_then(|r| r.market_cap)
                .filter(|c| *c > 0.0)
        };
        let btc = cap("bitcoin").ok_or_else(|| anyhow!("BTC market cap missing"))?;
        let usdt = cap("tether").ok_or_else(|| anyhow!("USDT market cap missing"))?;
        let usdc = cap("usd-coin").unwrap_or(0.0);

        Ok(round4((usdt + usdc) / btc))
    }

    /// Daily ratio history for the provider-limited 365-day window, oldest
    /// first. Joins the three coins' daily cap series by calendar date; days
    /// missing USDT or BTC are dropped.
    pub async fn ratio_history_365(&self) -> Option<Vec<(NaiveDate, f64)>> {
        swallow("crypto_history", self.fetch_history().await)
    }

    async fn fetch_history(&self) -> Result<Vec<(NaiveDate, f64)>> {
        let btc = self.coin_caps("bitcoin").await?;
        let usdt = self.coin_caps("tether").await?;
        let usdc = self.coin_caps("usd-coin").await?;

        let mut out = Vec::with_capacity(btc.len());
        for (date, btc_cap) in btc {
            let Some(usdt_cap) = usdt.get(&date).copied() else {
                continue;
            };
            let usdc_cap = usdc.get(&date).copied().unwrap_or(0.0);
            if btc_cap > 0.0 && usdt_cap > 0.0 {
                out.push((date, round4((usdt_cap + usdc_cap) / btc_cap)));
            }
        }
        if out.is_empty() {
            return Err(anyhow!("crypto history join produced no rows"));
        }
        Ok(out)
    }

    async fn coin_caps(&self, coin: &str) -> Result<BTreeMap<NaiveDate, f64>> {
        let url = format!(
            "{}/api/v3/coins/{}/market_chart?vs_currency=usd&days=365&interval=daily",
            self.base_url, coin
        );
        let chart: MarketChart = self
            .request(&url)
            .await
            .with_context(|| format!("{coin} market chart request"))?;

        let mut by_date = BTreeMap::new();
        for (ts_ms, cap) in chart.market_caps {
            let Some(dt) = DateTime::from_timestamp_millis(ts_ms) else {
                continue;
            };
            // Last sample of a day wins (the series ends with a live point).
            by_date.insert(dt.date_naive(), cap);
        }
        Ok(by_date)
    }

    async fn request<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut req = self.client.get(url);
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }
        req.send()
            .await
            .context("request")?
            .error_for_status()
            .context("non-2xx")?
            .json()
            .await
            .context("decoding JSON")
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
