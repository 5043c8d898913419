// src/sources/imf.rs
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::swallow;

/// SDMX CompactData adapter (IMF IFS). Fallback source for sovereign yields
/// and the only source for monthly reserves. Series absence is common for
/// smaller economies; callers treat `None` as "metric unavailable".
pub struct ImfSdmx {
    client: Client,
    base_url: String,
}

/// IFS indicator: government bond yield, percent per annum.
pub const GOV_BOND_YIELD: &str = "FIGB_PA";
/// IFS indicator: official reserve assets, US dollars.
pub const RESERVES_USD: &str = "RAXG_USD";

#[derive(Debug, Deserialize)]
struct CompactEnvelope {
    #[serde(rename = "CompactData")]
    compact: CompactData,
}

#[derive(Debug, Deserialize)]
struct CompactData {
    #[serde(rename = "DataSet")]
    dataset: Option<DataSet>,
}

#[derive(Debug, Deserialize)]
struct DataSet {
    #[serde(rename = "Series")]
    series: Option<Series>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(rename = "Obs", default)]
    obs: Vec<Obs>,
}

#[derive(Debug, Deserialize)]
struct Obs {
    #[serde(rename = "@TIME_PERIOD")]
    time_period: String,
    /// The service emits this as either a number or a string.
    #[serde(rename = "@OBS_VALUE")]
    value: Option<Value>,
}

impl ImfSdmx {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "http://dataservices.imf.org/REST/SDMX_JSON.svc".to_string(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Monthly series for `(area, indicator)`, oldest first, each observation
    /// dated to the first of its month. `None` when the series does not exist
    /// or has no observations.
    pub async fn monthly_series(
        &self,
        area: &str,
        indicator: &str,
        start_year: i32,
    ) -> Option<Vec<(NaiveDate, f64)>> {
        swallow(
            "imf_sdmx",
            self.fetch_monthly(area, indicator, start_year).await,
        )
    }

    /// Latest observation of a monthly series.
    pub async fn latest_monthly(
        &self,
        area: &str,
        indicator: &str,
        start_year: i32,
    ) -> Option<(NaiveDate, f64)> {
        let series = self.monthly_series(area, indicator, start_year).await?;
        series.last().copied()
    }

    async fn fetch_monthly(
        &self,
        area: &str,
        indicator: &str,
        start_year: i32,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let url = format!(
            "{}/CompactData/IFS/M.{}.{}?startPeriod={}",
            self.base_url, area, indicator, start_year
        );
        let envelope: CompactEnvelope = self
            .client
            .get(&url)
            .send()
            .await
            .context("SDMX request")?
            .error_for_status()
            .context("SDMX non-2xx")?
            .json()
            .await
            .context("decoding SDMX JSON")?;

        let series = envelope
            .compact
            .dataset
            .and_then(|d| d.series)
            .ok_or_else(|| anyhow!("no SDMX series for {area}.{indicator}"))?;

        let mut out = Vec::with_capacity(series.obs.len());
        for obs in series.obs {
            let Some(value) = obs.value.as_ref().and_then(parse_obs_value) else {
                continue;
            };
            let Some(date) = parse_month(&obs.time_period) else {
                continue;
            };
            out.push((date, value));
        }
        out.sort_by_key(|(d, _)| *d);
        if out.is_empty() {
            return Err(anyhow!("SDMX series {area}.{indicator} is empty"));
        }
        Ok(out)
    }
}

fn parse_obs_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// "2026-05" -> 2026-05-01.
fn parse_month(period: &str) -> Option<NaiveDate> {
    let (y, m) = period.split_once('-')?;
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_periods_parse_to_first_of_month() {
        assert_eq!(
            parse_month("2026-05"),
            NaiveDate::from_ymd_opt(2026, 5, 1)
        );
        assert_eq!(parse_month("2026"), None);
        assert_eq!(parse_month("garbage"), None);
    }

    #[test]
    fn obs_values_accept_string_or_number() {
        assert_eq!(parse_obs_value(&serde_json::json!(4.25)), Some(4.25));
        assert_eq!(parse_obs_value(&serde_json::json!("4.25")), Some(4.25));
        assert_eq!(parse_obs_value(&serde_json::json!(null)), None);
    }
}
