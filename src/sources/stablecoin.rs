// src/sources/stablecoin.rs
use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::swallow;
use crate::mathx::median;

/// Fewer quotes than this and the premium is not representative.
const MIN_EXCHANGES: usize = 2;

/// Stablecoin exchange-quote provider (CriptoYa; Argentina only). The
/// premium is the median effective ask across exchanges against the
/// official FX rate.
pub struct Criptoya {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeQuote {
    /// Ask including exchange fees.
    #[serde(rename = "totalAsk")]
    total_ask: Option<f64>,
}

impl Criptoya {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://criptoya.com".to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Premium of the median total-ask over the official rate, in percent.
    /// Requires at least two usable exchange quotes.
    pub async fn premium(&self, official_fx: f64) -> Option<f64> {
        swallow("stablecoin_premium", self.fetch_premium(official_fx).await)
    }

    async fn fetch_premium(&self, official_fx: f64) -> Result<f64> {
        if official_fx <= 0.0 {
            return Err(anyhow!("official FX rate is non-positive"));
        }
        let url = format!("{}/api/usdt/ars/1", self.base_url);
        let quotes: HashMap<String, ExchangeQuote> = self
            .client
            .get(&url)
            .send()
            .await
            .context("stablecoin quotes request")?
            .error_for_status()
            .context("stablecoin quotes non-2xx")?
            .json()
            .await
            .context("decoding stablecoin quotes JSON")?;

        let asks: Vec<f64> = quotes
            .values()
            .filter_map(|q| q.total_ask)
            .filter(|a| *a > 0.0)
            .collect();
        if asks.len() < MIN_EXCHANGES {
            return Err(anyhow!(
                "only {} usable exchange quotes (need {MIN_EXCHANGES})",
                asks.len()
            ));
        }
        let Some(mid) = median(&asks) else {
            return Err(anyhow!("no usable exchange quotes"));
        };
        Ok((mid - official_fx) / official_fx * 100.0)
    }
}
