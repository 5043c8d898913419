// src/sources/fred.rs
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use super::swallow;

/// Primary macroeconomic source (FRED observations endpoint). Serves the
/// shared risk-free daily yield and the sovereign yields of countries whose
/// series exists here.
pub struct FredSeries {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Series id of the shared reference long-tenor yield.
pub const RISK_FREE_SERIES: &str = "DGS10";

#[derive(Debug, Deserialize)]
struct FredResponse {
    observations: Vec<FredObs>,
}

#[derive(Debug, Deserialize)]
struct FredObs {
    date: String,
    /// "." marks market holidays / not-yet-published days.
    value: String,
}

impl FredSeries {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: "https://api.stlouisfed.org".to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Most recent non-missing observation of a series. Pulls a small
    /// newest-first page so weekend/holiday "." placeholders can be skipped.
    pub async fn latest_observation(&self, series_id: &str) -> Option<(NaiveDate, f64)> {
        swallow("fred_latest", self.fetch_latest(series_id).await)
    }

    async fn fetch_latest(&self, series_id: &str) -> Result<(NaiveDate, f64)> {
        let obs = self.fetch_page(series_id, "desc", 10, None).await?;
        obs.into_iter()
            .next()
            .ok_or_else(|| anyhow!("no published observations for {series_id}"))
    }

    /// Full usable series, oldest first, optionally bounded below (backfill).
    pub async fn series(
        &self,
        series_id: &str,
        start: Option<NaiveDate>,
    ) -> Option<Vec<(NaiveDate, f64)>> {
        swallow(
            "fred_series",
            self.fetch_page(series_id, "asc", 100_000, start).await,
        )
    }

    async fn fetch_page(
        &self,
        series_id: &str,
        order: &str,
        limit: usize,
        start: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let mut url = format!(
            "{}/fred/series/observations?series_id={}&api_key={}&file_type=json&sort_order={}&limit={}",
            self.base_url, series_id, self.api_key, order, limit
        );
        if let Some(s) = start {
            url.push_str(&format!("&observation_start={s}"));
        }
        let resp: FredResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("series request")?
            .error_for_status()
            .context("series non-2xx")?
            .json()
            .await
            .context("decoding series JSON")?;

        let mut out = Vec::with_capacity(resp.observations.len());
        for obs in resp.observations {
            if obs.value == "." {
                continue;
            }
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
                .with_context(|| format!("bad observation date {}", obs.date))?;
            let value: f64 = obs
                .value
                .parse()
                .with_context(|| format!("bad observation value {}", obs.value))?;
            out.push((date, value));
        }
        if out.is_empty() {
            return Err(anyhow!("series {series_id} had no usable observations"));
        }
        Ok(out)
    }
}
