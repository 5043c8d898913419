//! # Backfill Reducers
//! One-shot historical ingestors, one per source family. Each turns a sparse
//! provider series into dense per-day rows via forward-fill and pushes them
//! through the partial-upsert path in batches. Offline jobs; they sleep
//! between provider calls to stay inside free-tier rate limits.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};

use super::HISTORY_ANCHOR;
use crate::mathx::{pct_change, rolling_std_log_returns};
use crate::sources::fred::RISK_FREE_SERIES;
use crate::sources::{reserves, sovereign, Sources};
use crate::store::{Store, UpsertObservation};

/// Reference batch size for upserts.
const BATCH_SIZE: usize = 500;
/// Polite delay between provider calls.
const PROVIDER_DELAY: Duration = Duration::from_millis(1200);
/// Daily FX bars to request per country (roughly 20 years).
const FX_HISTORY_BARS: usize = 5000;
/// Rolling window for FX volatility.
const FX_VOL_WINDOW: usize = 30;

/// Dense daily FX history: close plus rolling volatility. The parallel-market
/// gap is attached to the latest row only; there is no historical source.
pub async fn backfill_fx(store: &Store, sources: &Sources) -> Result<()> {
    let countries = store.load_countries().await?;
    let today = Utc::now().date_naive();

    for country in &countries {
        let Some(series) = sources.fx.daily_series(&country.currency, FX_HISTORY_BARS).await
        else {
            tracing::warn!(iso2 = %country.iso2, "fx history unavailable, skipping");
            continue;
        };

        let closes: Vec<Option<f64>> = series.iter().map(|b| Some(b.close)).collect();
        let vols = rolling_std_log_returns(&closes, FX_VOL_WINDOW);

        let mut rows: Vec<UpsertObservation> = series
            .iter()
            .zip(vols)
            .filter(|(bar, _)| bar.date >= HISTORY_ANCHOR)
            .map(|(bar, vol)| {
                let mut obs = UpsertObservation::new(country.id, bar.date);
                obs.fx_close = Some(bar.close);
                obs.fx_vol = vol;
                obs
            })
            .collect();

        if country.iso2 == "AR" {
            if let (Some(gap), Some(last)) =
                (sources.parallel.parallel_gap().await, rows.last_mut())
            {
                if last.date == today {
                    last.parallel_gap = Some(gap);
                }
            }
        }

        upsert_batched(store, &rows).await?;
        tracing::info!(iso2 = %country.iso2, rows = rows.len(), "fx backfill done");
        tokio::time::sleep(PROVIDER_DELAY).await;
    }
    Ok(())
}

/// Annual CPI forward-filled to every calendar day of its year. Acceleration
/// is the two-year delta, null for a series' first two years.
pub async fn backfill_inflation(store: &Store, sources: &Sources) -> Result<()> {
    let countries = store.load_countries().await?;
    let today = Utc::now().date_naive();

    for country in &countries {
        let Some(series) = sources.inflation.annual_cpi_yoy(&country.iso2).await else {
            tracing::warn!(iso2 = %country.iso2, "cpi series unavailable, skipping");
            continue;
        };

        let mut rows = Vec::new();
        for (i, point) in series.iter().enumerate() {
            let accel = if i >= 2 {
                Some(point.yoy - series[i - 2].yoy)
            } else {
                None
            };
            for date in days_of_year(point.year, today) {
                if date < HISTORY_ANCHOR {
                    continue;
                }
                let mut obs = UpsertObservation::new(country.id, date);
                obs.inflation_yoy = Some(point.yoy);
                obs.inflation = accel;
                rows.push(obs);
            }
        }

        upsert_batched(store, &rows).await?;
        tracing::info!(iso2 = %country.iso2, rows = rows.len(), "inflation backfill done");
        tokio::time::sleep(PROVIDER_DELAY).await;
    }
    Ok(())
}

/// Monthly sovereign yields forward-filled daily, spread against the daily
/// risk-free series. The spread is null on days the risk-free value is
/// missing (market holidays).
pub async fn backfill_sovereign(store: &Store, sources: &Sources) -> Result<()> {
    let countries = store.load_countries().await?;
    let today = Utc::now().date_naive();

    let risk_free = sources
        .fred
        .series(RISK_FREE_SERIES, Some(HISTORY_ANCHOR))
        .await
        .context("risk-free history is required for the sovereign backfill")?;
    let rf_by_date: std::collections::BTreeMap<NaiveDate, f64> = risk_free.into_iter().collect();

    for country in &countries {
        let Some(series) = sovereign::yield_history(&sources.fred, &sources.imf, country).await
        else {
            tracing::warn!(iso2 = %country.iso2, "sovereign history unavailable, skipping");
            continue;
        };

        let daily = forward_fill_daily(&series, today);
        let rows: Vec<UpsertObservation> = daily
            .into_iter()
            .filter(|(date, _)| *date >= HISTORY_ANCHOR)
            .map(|(date, yield_value)| {
                let rf = rf_by_date.get(&date).copied();
                let mut obs = UpsertObservation::new(country.id, date);
                obs.sovereign_yield = Some(yield_value);
                obs.us_10y = rf;
                obs.risk_spread = rf.map(|r| yield_value - r);
                obs
            })
            .collect();

        upsert_batched(store, &rows).await?;
        tracing::info!(iso2 = %country.iso2, rows = rows.len(), "sovereign backfill done");
        tokio::time::sleep(PROVIDER_DELAY).await;
    }
    Ok(())
}

/// Monthly reserves forward-filled daily. The 90-day change is computed at
/// monthly granularity (3-month lag) before expansion.
pub async fn backfill_reserves(store: &Store, sources: &Sources) -> Result<()> {
    let countries = store.load_countries().await?;
    let today = Utc::now().date_naive();

    for country in &countries {
        let Some(series) = reserves::reserves_history(&sources.imf, country).await else {
            tracing::warn!(iso2 = %country.iso2, "reserves history unavailable, skipping");
            continue;
        };

        // (month, level, change-vs-3-months-earlier)
        let monthly: Vec<(NaiveDate, f64, Option<f64>)> = series
            .iter()
            .enumerate()
            .map(|(i, (date, level))| {
                let change = if i >= 3 {
                    pct_change(*level, Some(series[i - 3].1))
                } else {
                    None
                };
                (*date, *level, change)
            })
            .collect();

        let level_series: Vec<(NaiveDate, f64)> =
            monthly.iter().map(|(d, l, _)| (*d, *l)).collect();
        let daily = forward_fill_daily(&level_series, today);

        let rows: Vec<UpsertObservation> = daily
            .into_iter()
            .filter(|(date, _)| *date >= HISTORY_ANCHOR)
            .map(|(date, level)| {
                // The change rides with the month the level came from.
                let change = monthly
                    .iter()
                    .rev()
                    .find(|(m, _, _)| *m <= date)
                    .and_then(|(_, _, c)| *c);
                let mut obs = UpsertObservation::new(country.id, date);
                obs.reserves_level = Some(level);
                obs.reserves_change = change;
                obs
            })
            .collect();

        upsert_batched(store, &rows).await?;
        tracing::info!(iso2 = %country.iso2, rows = rows.len(), "reserves backfill done");
        tokio::time::sleep(PROVIDER_DELAY).await;
    }
    Ok(())
}

/// Global crypto ratio, one provider-limited 365-day pull, replicated onto
/// every country's rows.
pub async fn backfill_crypto(store: &Store, sources: &Sources) -> Result<()> {
    let countries = store.load_countries().await?;
    let Some(history) = sources.crypto.ratio_history_365().await else {
        anyhow::bail!("crypto ratio history unavailable");
    };

    for country in &countries {
        let rows: Vec<UpsertObservation> = history
            .iter()
            .map(|(date, ratio)| {
                let mut obs = UpsertObservation::new(country.id, *date);
                obs.crypto_ratio = Some(*ratio);
                obs
            })
            .collect();
        upsert_batched(store, &rows).await?;
        tracing::info!(iso2 = %country.iso2, rows = rows.len(), "crypto backfill done");
    }
    Ok(())
}

/// Expand a sparse ascending series to one value per calendar day, carrying
/// the last observation forward up to `until` (inclusive).
pub(crate) fn forward_fill_daily(
    series: &[(NaiveDate, f64)],
    until: NaiveDate,
) -> Vec<(NaiveDate, f64)> {
    let Some(&(first_date, _)) = series.first() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut idx = 0usize;
    let mut current = series[0].1;
    let mut date = first_date;
    while date <= until {
        while idx + 1 < series.len() && series[idx + 1].0 <= date {
            idx += 1;
            current = series[idx].1;
        }
        out.push((date, current));
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    out
}

/// All days of `year`, capped at `today` so the current year stays partial.
fn days_of_year(year: i32, today: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(366);
    let Some(mut date) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return out;
    };
    while date.year() == year && date <= today {
        out.push(date);
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    out
}

async fn upsert_batched(store: &Store, rows: &[UpsertObservation]) -> Result<()> {
    for chunk in rows.chunks(BATCH_SIZE) {
        store.upsert_observations(chunk).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn forward_fill_expands_monthly_to_daily() {
        let series = vec![(d(2026, 1, 1), 10.0), (d(2026, 3, 1), 12.0)];
        let daily = forward_fill_daily(&series, d(2026, 3, 3));
        // Jan (31) + Feb (28) + Mar 1-3 = 62 days.
        assert_eq!(daily.len(), 62);
        assert_eq!(daily[0], (d(2026, 1, 1), 10.0));
        assert_eq!(daily[58], (d(2026, 2, 28), 10.0));
        assert_eq!(daily[59], (d(2026, 3, 1), 12.0));
        assert_eq!(daily[61], (d(2026, 3, 3), 12.0));
    }

    #[test]
    fn forward_fill_of_empty_series_is_empty() {
        assert!(forward_fill_daily(&[], d(2026, 1, 1)).is_empty());
    }

    #[test]
    fn days_of_year_caps_at_today() {
        let days = days_of_year(2026, d(2026, 2, 10));
        assert_eq!(days.len(), 41);
        let full = days_of_year(2024, d(2026, 2, 10));
        assert_eq!(full.len(), 366); // leap year
    }
}
