// src/sources/inflation.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::swallow;

/// One annual CPI observation. The provider is annual-only; forward-filling
/// to calendar days happens downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualYoy {
    pub year: i32,
    pub yoy: f64,
}

/// Annual CPI YoY provider (World Bank indicator `FP.CPI.TOTL.ZG`).
pub struct WorldBank {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WbPoint {
    date: String,
    value: Option<f64>,
}

impl WorldBank {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://api.worldbank.org".to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Non-null annual YoY series for one country, oldest first.
    pub async fn annual_cpi_yoy(&self, iso2: &str) -> Option<Vec<AnnualYoy>> {
        swallow("inflation", self.fetch_series(iso2).await)
    }

    async fn fetch_series(&self, iso2: &str) -> Result<Vec<AnnualYoy>> {
        let url = format!(
            "{}/v2/country/{}/indicator/FP.CPI.TOTL.ZG?format=json&per_page=100",
            self.base_url, iso2
        );
        // Response shape: [ metadata, [ {date, value, ...}, ... ] ]
        let body: Vec<Value> = self
            .client
            .get(&url)
            .send()
            .await
            .context("CPI request")?
            .error_for_status()
            .context("CPI non-2xx")?
            .json()
            .await
            .context("decoding CPI JSON")?;

        let points_raw = body
            .get(1)
            .cloned()
            .ok_or_else(|| anyhow!("CPI response missing data element"))?;
        let points: Vec<WbPoint> =
            serde_json::from_value(points_raw).context("decoding CPI points")?;

        let mut out: Vec<AnnualYoy> = points
            .into_iter()
            .filter_map(|p| {
                let year: i32 = p.date.parse().ok()?;
                let yoy = p.value?;
                Some(AnnualYoy { year, yoy })
            })
            .collect();
        out.sort_by_key(|p| p.year);
        if out.is_empty() {
            return Err(anyhow!("no non-null CPI observations for {iso2}"));
        }
        Ok(out)
    }
}

/// Latest observation plus the two-year-earlier baseline used for the
/// acceleration metric. Acceleration smooths single-year noise by differencing
/// against `year - 2`; the first two years of a series have no baseline.
pub fn latest_with_baseline(series: &[AnnualYoy]) -> Option<(AnnualYoy, Option<f64>)> {
    let latest = *series.last()?;
    let baseline = series
        .iter()
        .find(|p| p.year == latest.year - 2)
        .map(|p| p.yoy);
    Some((latest, baseline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_two_years_back() {
        let series = vec![
            AnnualYoy { year: 2022, yoy: 7.0 },
            AnnualYoy { year: 2023, yoy: 5.0 },
            AnnualYoy { year: 2024, yoy: 4.0 },
        ];
        let (latest, baseline) = latest_with_baseline(&series).unwrap();
        assert_eq!(latest.year, 2024);
        assert_eq!(baseline, Some(7.0));
    }

    #[test]
    fn missing_baseline_year_yields_none() {
        let series = vec![
            AnnualYoy { year: 2021, yoy: 3.0 },
            AnnualYoy { year: 2024, yoy: 4.0 },
        ];
        let (_, baseline) = latest_with_baseline(&series).unwrap();
        assert_eq!(baseline, None);
        assert_eq!(latest_with_baseline(&[]), None);
    }
}
