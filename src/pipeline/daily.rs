//! # Daily Orchestrator
//! One scheduled run: idempotency guard, prelude loads, shared fetches,
//! sequential per-country fan-out, scoring, partial upsert, run log.
//!
//! Adapter failures never abort the run; they surface as missing metrics and
//! run-level error strings. The only fatal conditions are the prelude store
//! reads.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use metrics::{counter, gauge};
use serde_json::{json, Map, Value};

use super::{DailyRunOutcome, RunStatus};
use crate::mathx::{pct_change, rolling_std_log_returns};
use crate::scoring::{compute_score, NormMap, RawMetrics};
use crate::sources::fred::RISK_FREE_SERIES;
use crate::sources::inflation::latest_with_baseline;
use crate::sources::sovereign::{self, YieldSource};
use crate::sources::{reserves, Sources};
use crate::store::{Country, ObsColumn, Store, UpsertObservation};

/// Rolling window for FX volatility.
const FX_VOL_WINDOW: usize = 30;
/// Reserves-change baseline window, in calendar days before the run date
/// (approximating 90 days at monthly source granularity).
const RESERVES_BASELINE_MIN_DAYS: i64 = 80;
const RESERVES_BASELINE_MAX_DAYS: i64 = 100;

/// Run the pipeline for "now". Returns `Err` only when the prelude store
/// reads fail; everything else degrades to `partial`/`error` status.
pub async fn run_daily(store: &Store, sources: &Sources, now: DateTime<Utc>) -> Result<DailyRunOutcome> {
    let started = Instant::now();
    let run_date = now.date_naive();

    // Idempotency guard: a same-day run that produced data short-circuits.
    if store
        .run_already_completed(run_date)
        .await
        .context("idempotency guard")?
    {
        tracing::info!(%run_date, "run already completed today, skipping");
        return Ok(DailyRunOutcome::skipped(
            run_date,
            started.elapsed().as_millis() as u64,
        ));
    }

    // Prelude: fatal on failure.
    let countries = store.load_countries().await.context("prelude: countries")?;
    let norms = store.load_norm_maps().await.context("prelude: norms")?;

    let mut errors: Vec<String> = Vec::new();

    // Shared fetches, concurrent. Failures are recorded, not fatal.
    let (crypto_ratio, risk_free) = tokio::join!(
        sources.crypto.stablecoin_btc_ratio(),
        sources.fred.latest_observation(RISK_FREE_SERIES),
    );
    if crypto_ratio.is_none() {
        errors.push("shared: crypto ratio fetch failed".to_string());
    }
    if risk_free.is_none() {
        errors.push("shared: risk-free yield fetch failed".to_string());
    }
    let risk_free_value = risk_free.map(|(_, v)| v);

    let is_monthly = run_date.day() == 1;
    tracing::info!(%run_date, is_monthly, countries = countries.len(), "daily run starting");

    let mut updated = 0usize;
    for country in &countries {
        let country_norms = norms.get(&country.id).cloned().unwrap_or_default();
        match run_country(
            store,
            sources,
            country,
            &country_norms,
            run_date,
            is_monthly,
            crypto_ratio,
            risk_free_value,
            &mut errors,
        )
        .await
        {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::warn!(iso2 = %country.iso2, error = format!("{e:#}"), "country step failed");
                errors.push(format!("{}: {e:#}", country.iso2));
            }
        }
    }

    let status = if updated == 0 {
        RunStatus::Error
    } else if errors.is_empty() {
        RunStatus::Success
    } else {
        RunStatus::Partial
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    let detail = json!({
        "countries_updated": updated,
        "monthly": is_monthly,
        "skipped": false,
        "errors": errors,
    });
    if let Err(e) = store
        .insert_run(run_date, status.as_str(), detail, duration_ms as i64)
        .await
    {
        tracing::error!(error = format!("{e:#}"), "failed to write run log");
    }

    counter!("pipeline_runs_total", "status" => status.as_str()).increment(1);
    gauge!("pipeline_last_run_ts").set(now.timestamp() as f64);
    tracing::info!(status = status.as_str(), updated, errors = errors.len(), duration_ms, "daily run finished");

    Ok(DailyRunOutcome {
        run_date,
        status,
        skipped: false,
        countries_updated: updated,
        errors,
        duration_ms,
    })
}

/// Forward-fill primer: the latest non-null value per carried column.
struct LastKnown {
    inflation_yoy: Option<f64>,
    sovereign_yield: Option<f64>,
    reserves_level: Option<f64>,
    stablecoin_premium: Option<f64>,
    inflation: Option<f64>,
    risk_spread: Option<f64>,
    reserves_change: Option<f64>,
}

#[allow(clippy::too_many_arguments)]
async fn run_country(
    store: &Store,
    sources: &Sources,
    country: &Country,
    norms: &NormMap,
    run_date: NaiveDate,
    is_monthly: bool,
    crypto_ratio: Option<f64>,
    risk_free: Option<f64>,
    errors: &mut Vec<String>,
) -> Result<()> {
    let mut adapter_flags = Map::new();
    let mut forward_filled: Vec<&'static str> = Vec::new();

    // Today's FX close; the provider's reported date keys the row. When FX
    // fails the row keys on today's UTC date and fx columns stay untouched.
    let fx = sources.fx.latest_close(&country.currency).await;
    if fx.is_none() {
        errors.push(format!("{}: fx fetch failed", country.iso2));
    }
    let row_date = fx.map(|f| f.date).unwrap_or(run_date);

    // FX volatility: prior closes joined with today's close, rolled at 30.
    let fx_vol = match fx {
        Some(f) => {
            let prior = store
                .fx_closes_before(country.id, f.date, FX_VOL_WINDOW as i64)
                .await
                .context("reading prior fx closes")?;
            fx_vol_with_today(&prior.iter().map(|(_, c)| *c).collect::<Vec<_>>(), f.close)
        }
        None => None,
    };

    // Parallel-market gap, single country.
    let parallel_gap = if country.iso2 == "AR" {
        sources.parallel.parallel_gap().await
    } else {
        None
    };

    // Forward-fill priming, concurrent point queries.
    let last = {
        let (inflation_yoy, sovereign_yield, reserves_level, stablecoin_premium, inflation, risk_spread, reserves_change) = tokio::try_join!(
            store.last_known(country.id, ObsColumn::InflationYoy),
            store.last_known(country.id, ObsColumn::SovereignYield),
            store.last_known(country.id, ObsColumn::ReservesLevel),
            store.last_known(country.id, ObsColumn::StablecoinPremium),
            store.last_known(country.id, ObsColumn::Inflation),
            store.last_known(country.id, ObsColumn::RiskSpread),
            store.last_known(country.id, ObsColumn::ReservesChange),
        )
        .context("forward-fill point queries")?;
        LastKnown {
            inflation_yoy: inflation_yoy.map(|(_, v)| v),
            sovereign_yield: sovereign_yield.map(|(_, v)| v),
            reserves_level: reserves_level.map(|(_, v)| v),
            stablecoin_premium: stablecoin_premium.map(|(_, v)| v),
            inflation: inflation.map(|(_, v)| v),
            risk_spread: risk_spread.map(|(_, v)| v),
            reserves_change: reserves_change.map(|(_, v)| v),
        }
    };

    // Stablecoin premium, single country, only when today's FX anchored it.
    let stablecoin_premium = if country.iso2 == "AR" {
        match fx {
            Some(f) => match sources.stablecoin.premium(f.close).await {
                Some(p) => Some(p),
                None => {
                    errors.push(format!("{}: stablecoin premium fetch failed", country.iso2));
                    if last.stablecoin_premium.is_some() {
                        forward_filled.push("stablecoin_premium");
                    }
                    last.stablecoin_premium
                }
            },
            None => last.stablecoin_premium,
        }
    } else {
        None
    };

    // Monthly cadence: refetch the sparse series; otherwise carry forward.
    let mut inflation_yoy = last.inflation_yoy;
    let mut inflation = last.inflation;
    let mut sovereign_yield = last.sovereign_yield;
    let mut risk_spread = last.risk_spread;
    let mut reserves_level = last.reserves_level;
    let mut reserves_change = last.reserves_change;

    if is_monthly {
        match sources.inflation.annual_cpi_yoy(&country.iso2).await {
            Some(series) => {
                if let Some((latest, baseline)) = latest_with_baseline(&series) {
                    inflation_yoy = Some(latest.yoy);
                    // Two-year delta; a series too short for a baseline keeps
                    // the carried acceleration instead of erasing it.
                    inflation = baseline.map(|b| latest.yoy - b).or(inflation);
                }
            }
            None => {
                errors.push(format!("{}: inflation refetch failed", country.iso2));
                if inflation_yoy.is_some() {
                    forward_filled.push("inflation_yoy");
                }
            }
        }

        match sovereign::latest_yield(&sources.fred, &sources.imf, country).await {
            Some((_, value, source)) => {
                sovereign_yield = Some(value);
                risk_spread = risk_free.map(|rf| value - rf);
                if source == YieldSource::Fallback {
                    adapter_flags.insert("sovereign_fallback".into(), Value::Bool(true));
                }
            }
            None => {
                errors.push(format!("{}: sovereign yield refetch failed", country.iso2));
                if sovereign_yield.is_some() {
                    forward_filled.push("sovereign_yield");
                }
            }
        }

        match reserves::latest_reserves(&sources.imf, country).await {
            Some((_, level)) => {
                reserves_level = Some(level);
                let baseline = store
                    .reserves_level_in_window(
                        country.id,
                        run_date - Duration::days(RESERVES_BASELINE_MAX_DAYS),
                        run_date - Duration::days(RESERVES_BASELINE_MIN_DAYS),
                    )
                    .await
                    .context("reserves baseline query")?;
                reserves_change = pct_change(level, baseline);
            }
            None => {
                errors.push(format!("{}: reserves refetch failed", country.iso2));
                if reserves_level.is_some() {
                    forward_filled.push("reserves_level");
                }
            }
        }
    }

    let raw = RawMetrics {
        fx_vol,
        inflation,
        risk_spread,
        crypto_ratio,
        reserves_change,
        stablecoin_premium,
    };
    let scored = compute_score(&raw, norms);

    let mut flags = match &scored {
        Some(r) => r.flags.clone(),
        None => {
            let mut f = Map::new();
            f.insert("unscored".into(), Value::Bool(true));
            f
        }
    };
    if !forward_filled.is_empty() {
        flags.insert(
            "forward_filled".into(),
            Value::Array(forward_filled.iter().map(|c| Value::String((*c).into())).collect()),
        );
    }
    merge_flags(&mut flags, adapter_flags);

    let obs = UpsertObservation {
        country_id: country.id,
        date: row_date,
        fx_close: fx.map(|f| f.close),
        inflation_yoy,
        sovereign_yield,
        us_10y: risk_free,
        reserves_level,
        parallel_gap,
        fx_vol,
        inflation,
        risk_spread,
        crypto_ratio,
        reserves_change,
        stablecoin_premium,
        stress_score: scored.as_ref().map(|r| r.score),
        data_flags: Some(Value::Object(flags)),
    };
    store.upsert_observation(&obs).await.context("upsert")?;

    tracing::debug!(
        iso2 = %country.iso2,
        %row_date,
        score = ?obs.stress_score,
        "country updated"
    );
    Ok(())
}

/// Today's FX volatility: append today's close to the prior close series and
/// take the final rolling value.
pub(crate) fn fx_vol_with_today(prior_closes: &[f64], today_close: f64) -> Option<f64> {
    let mut closes: Vec<Option<f64>> = prior_closes.iter().map(|c| Some(*c)).collect();
    closes.push(Some(today_close));
    rolling_std_log_returns(&closes, FX_VOL_WINDOW)
        .last()
        .copied()
        .flatten()
}

/// Overlay `extra` onto `base` (last writer wins per key).
pub(crate) fn merge_flags(base: &mut Map<String, Value>, extra: Map<String, Value>) {
    for (k, v) in extra {
        base.insert(k, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fx_vol_needs_thirty_prior_closes() {
        let prior: Vec<f64> = (0..29).map(|i| 100.0 + i as f64 * 0.1).collect();
        assert!(fx_vol_with_today(&prior, 103.0).is_none());

        let prior: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 0.1).collect();
        assert!(fx_vol_with_today(&prior, 103.1).is_some());
    }

    #[test]
    fn fx_vol_is_zero_for_flat_series() {
        let prior = vec![250.0; 30];
        let vol = fx_vol_with_today(&prior, 250.0).unwrap();
        assert!(vol.abs() < 1e-12);
    }

    #[test]
    fn flag_merge_overlays_keys() {
        let mut base = Map::new();
        base.insert("partial".into(), Value::Bool(true));
        base.insert("low_confidence".into(), Value::Bool(false));

        let mut extra = Map::new();
        extra.insert("sovereign_fallback".into(), Value::Bool(true));
        extra.insert("low_confidence".into(), Value::Bool(true));

        merge_flags(&mut base, extra);
        assert_eq!(base["partial"], Value::Bool(true));
        assert_eq!(base["low_confidence"], Value::Bool(true));
        assert_eq!(base["sovereign_fallback"], Value::Bool(true));
    }
}
