//! # Normalization Builder
//! Offline (and quarterly) job that derives the p5/p95 clamp bounds per
//! (country, metric) from stored history and persists them for the scoring
//! engine. Degenerate or thin samples are skipped, never written.

use anyhow::Result;
use chrono::{Duration, Utc};

use super::HISTORY_ANCHOR;
use crate::mathx::percentile;
use crate::scoring::MetricName;
use crate::store::{ObsColumn, Store};

/// Metrics with fewer stored samples than this are left without bounds; a
/// later run can fill them once history accumulates.
const MIN_SAMPLES: usize = 10;
/// The crypto series is provider-limited to one year of history.
const CRYPTO_WINDOW_DAYS: i64 = 365;

fn column_for(metric: MetricName) -> ObsColumn {
    match metric {
        MetricName::FxVol => ObsColumn::FxVol,
        MetricName::Inflation => ObsColumn::Inflation,
        MetricName::RiskSpread => ObsColumn::RiskSpread,
        MetricName::CryptoRatio => ObsColumn::CryptoRatio,
        MetricName::ReservesChange => ObsColumn::ReservesChange,
        MetricName::StablecoinPremium => ObsColumn::StablecoinPremium,
    }
}

/// Rebuild every (country, metric) clamp from history.
pub async fn build_norms(store: &Store) -> Result<()> {
    let countries = store.load_countries().await?;
    let today = Utc::now().date_naive();

    for country in &countries {
        for metric in MetricName::ALL {
            let from = match metric {
                MetricName::CryptoRatio => Some(today - Duration::days(CRYPTO_WINDOW_DAYS)),
                _ => Some(HISTORY_ANCHOR),
            };
            let rows = store
                .metric_values(country.id, column_for(metric), from)
                .await?;
            if rows.len() < MIN_SAMPLES {
                tracing::debug!(
                    iso2 = %country.iso2,
                    metric = metric.as_str(),
                    samples = rows.len(),
                    "too few samples, skipping"
                );
                continue;
            }

            let values: Vec<f64> = rows.iter().map(|(_, v)| *v).collect();
            let (Some(p5), Some(p95)) = (percentile(&values, 5.0), percentile(&values, 95.0))
            else {
                continue;
            };
            if p95 <= p5 {
                tracing::warn!(
                    iso2 = %country.iso2,
                    metric = metric.as_str(),
                    p5,
                    p95,
                    "degenerate percentile bounds, refusing to persist"
                );
                continue;
            }

            let window_start = rows.first().map(|(d, _)| *d).unwrap_or(today);
            let window_end = rows.last().map(|(d, _)| *d).unwrap_or(today);
            store
                .upsert_norm(country.id, metric, p5, p95, window_start, window_end)
                .await?;
            tracing::info!(
                iso2 = %country.iso2,
                metric = metric.as_str(),
                p5,
                p95,
                samples = values.len(),
                "norm bounds updated"
            );
        }
    }
    Ok(())
}
