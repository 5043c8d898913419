// src/sources/fx.rs
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use super::swallow;

/// Most recent trading day's official close for one currency pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily FX series provider (Twelve Data `/time_series`, 1day interval).
pub struct TwelveData {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TdResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    values: Vec<TdBar>,
}

#[derive(Debug, Deserialize)]
struct TdBar {
    datetime: String,
    close: String,
}

impl TwelveData {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: "https://api.twelvedata.com".to_string(),
        }
    }

    /// Point the adapter at a mock server (tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Latest daily close of `USD/<currency>`. `None` on any failure.
    pub async fn latest_close(&self, currency: &str) -> Option<FxClose> {
        swallow("fx", self.fetch_series(currency, 1).await.and_then(|mut v| {
            v.pop().ok_or_else(|| anyhow!("empty FX series for {currency}"))
        }))
    }

    /// Long daily close series, oldest first (backfill).
    pub async fn daily_series(&self, currency: &str, bars: usize) -> Option<Vec<FxClose>> {
        swallow("fx_history", self.fetch_series(currency, bars).await)
    }

    async fn fetch_series(&self, currency: &str, bars: usize) -> Result<Vec<FxClose>> {
        let url = format!(
            "{}/time_series?symbol=USD/{}&interval=1day&outputsize={}&apikey={}",
            self.base_url, currency, bars, self.api_key
        );
        let resp: TdResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("FX series request")?
            .error_for_status()
            .context("FX series non-2xx")?
            .json()
            .await
            .context("decoding FX series JSON")?;

        if resp.status.as_deref() == Some("error") {
            return Err(anyhow!(
                "FX provider error: {}",
                resp.message.unwrap_or_default()
            ));
        }

        // Provider returns newest-first; flip to oldest-first.
        let mut out = Vec::with_capacity(resp.values.len());
        for bar in resp.values.into_iter().rev() {
            let date = NaiveDate::parse_from_str(&bar.datetime, "%Y-%m-%d")
                .with_context(|| format!("bad FX bar date {}", bar.datetime))?;
            let close: f64 = bar
                .close
                .parse()
                .with_context(|| format!("bad FX close {}", bar.close))?;
            if close > 0.0 {
                out.push(FxClose { date, close });
            }
        }
        if out.is_empty() {
            return Err(anyhow!("FX series for {currency} had no usable bars"));
        }
        Ok(out)
    }
}

/// Free parallel-market quote endpoint (Bluelytics; Argentina only).
pub struct Bluelytics {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BlueResponse {
    oficial: BlueQuote,
    blue: BlueQuote,
}

#[derive(Debug, Deserialize)]
struct BlueQuote {
    value_sell: f64,
}

impl Bluelytics {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://api.bluelytics.com.ar".to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Percentage gap between the parallel and official sell rates.
    pub async fn parallel_gap(&self) -> Option<f64> {
        swallow("parallel_gap", self.fetch_gap().await)
    }

    async fn fetch_gap(&self) -> Result<f64> {
        let url = format!("{}/v2/latest", self.base_url);
        let resp: BlueResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("parallel quote request")?
            .error_for_status()
            .context("parallel quote non-2xx")?
            .json()
            .await
            .context("decoding parallel quote JSON")?;

        if resp.oficial.value_sell <= 0.0 {
            return Err(anyhow!("official rate is non-positive"));
        }
        Ok((resp.blue.value_sell - resp.oficial.value_sell) / resp.oficial.value_sell * 100.0)
    }
}
