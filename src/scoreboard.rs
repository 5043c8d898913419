//! # Read-Side Composer
//! Builds the two public read surfaces: the current scoreboard (rankings,
//! 7/30-day deltas, per-component scores, audit flags) and the 30-day
//! per-country history. Component scores are recomputed from stored raw
//! values with the current normalization bounds, so a re-normalization can
//! shift historical components without touching stored stress scores.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::mathx::round1;
use crate::scoring::{component_scores, RawMetrics};
use crate::store::{Country, ObservationRow, Store};

/// Rows returned by the history surface.
const HISTORY_LIMIT: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct ScoreboardEntry {
    pub country: String,
    pub code: String,
    pub date: NaiveDate,
    pub stress_score: f64,
    pub rank: usize,
    pub delta_7d: Option<f64>,
    pub delta_30d: Option<f64>,
    pub components: BTreeMap<&'static str, Option<f64>>,
    pub partial: bool,
    pub missing: Vec<String>,
    pub low_confidence: bool,
    #[serde(skip)]
    country_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub stress_score: f64,
    pub components: BTreeMap<&'static str, Option<f64>>,
}

/// Current scoreboard across every country with at least one scored row,
/// ranked by stress score descending (ties stable by country id).
pub async fn current_scoreboard(store: &Store) -> Result<Vec<ScoreboardEntry>> {
    let countries = store.load_countries().await?;
    let norms = store.load_norm_maps().await?;

    let mut entries = Vec::with_capacity(countries.len());
    for country in &countries {
        let Some(latest) = store.latest_scored(country.id).await? else {
            continue;
        };
        let Some(score) = latest.stress_score else {
            continue;
        };

        let (week_base, month_base) = tokio::try_join!(
            store.scored_on_or_before(country.id, latest.date - Duration::days(7)),
            store.scored_on_or_before(country.id, latest.date - Duration::days(30)),
        )?;

        let country_norms = norms.get(&country.id).cloned().unwrap_or_default();
        let (partial, missing, low_confidence) = read_flags(&latest);

        entries.push(ScoreboardEntry {
            country: country.name.clone(),
            code: country.iso2.clone(),
            date: latest.date,
            stress_score: score,
            rank: 0,
            delta_7d: delta_against(score, week_base.as_ref()),
            delta_30d: delta_against(score, month_base.as_ref()),
            components: component_scores(&raw_from_row(&latest), &country_norms),
            partial,
            missing,
            low_confidence,
            country_id: country.id,
        });
    }

    Ok(rank_entries(entries))
}

/// Up to the last 30 scored rows for one country, oldest first.
pub async fn country_history(store: &Store, country: &Country) -> Result<Vec<HistoryPoint>> {
    let norms = store.load_norm_maps().await?;
    let country_norms = norms.get(&country.id).cloned().unwrap_or_default();

    let rows = store.scored_history(country.id, HISTORY_LIMIT).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let score = row.stress_score?;
            Some(HistoryPoint {
                date: row.date,
                stress_score: score,
                components: component_scores(&raw_from_row(row), &country_norms),
            })
        })
        .collect())
}

/// Sort by score descending with ties stable by country id, then number the
/// ranks from 1.
pub(crate) fn rank_entries(mut entries: Vec<ScoreboardEntry>) -> Vec<ScoreboardEntry> {
    entries.sort_by(|a, b| {
        b.stress_score
            .partial_cmp(&a.stress_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.country_id.cmp(&b.country_id))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

/// Rounded delta against a baseline row; `None` when no baseline exists —
/// the absence of history is not a zero change.
pub(crate) fn delta_against(score: f64, baseline: Option<&ObservationRow>) -> Option<f64> {
    let base = baseline.and_then(|r| r.stress_score)?;
    Some(round1(score - base))
}

pub(crate) fn raw_from_row(row: &ObservationRow) -> RawMetrics {
    RawMetrics {
        fx_vol: row.fx_vol,
        inflation: row.inflation,
        risk_spread: row.risk_spread,
        crypto_ratio: row.crypto_ratio,
        reserves_change: row.reserves_change,
        stablecoin_premium: row.stablecoin_premium,
    }
}

fn read_flags(row: &ObservationRow) -> (bool, Vec<String>, bool) {
    let Some(flags) = row.data_flags.as_ref().and_then(|v| v.as_object()) else {
        return (false, Vec::new(), false);
    };
    let partial = flags
        .get("partial")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let low_confidence = flags
        .get("low_confidence")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let missing = flags
        .get("missing")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    (partial, missing, low_confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(country_id: i64, score: f64) -> ScoreboardEntry {
        ScoreboardEntry {
            country: format!("Country {country_id}"),
            code: format!("C{country_id}"),
            date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            stress_score: score,
            rank: 0,
            delta_7d: None,
            delta_30d: None,
            components: BTreeMap::new(),
            partial: false,
            missing: Vec::new(),
            low_confidence: false,
            country_id,
        }
    }

    #[test]
    fn ranking_is_descending_with_stable_ties() {
        let ranked = rank_entries(vec![
            entry(3, 55.0),
            entry(1, 70.0),
            entry(2, 55.0),
            entry(4, 12.5),
        ]);
        let order: Vec<(i64, usize)> = ranked.iter().map(|e| (e.country_id, e.rank)).collect();
        // Tie at 55.0 resolves by country id: 2 before 3.
        assert_eq!(order, vec![(1, 1), (2, 2), (3, 3), (4, 4)]);
    }

    #[test]
    fn delta_is_null_without_baseline() {
        assert_eq!(delta_against(50.0, None), None);
    }

    #[test]
    fn delta_rounds_to_one_decimal() {
        let mut row = baseline_row(41.23);
        assert_eq!(delta_against(50.0, Some(&row)), Some(8.8));
        row.stress_score = None;
        assert_eq!(delta_against(50.0, Some(&row)), None);
    }

    fn baseline_row(score: f64) -> ObservationRow {
        ObservationRow {
            id: 1,
            country_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 7, 25).unwrap(),
            fx_close: None,
            inflation_yoy: None,
            sovereign_yield: None,
            us_10y: None,
            reserves_level: None,
            parallel_gap: None,
            fx_vol: None,
            inflation: None,
            risk_spread: None,
            crypto_ratio: None,
            reserves_change: None,
            stablecoin_premium: None,
            stress_score: Some(score),
            data_flags: None,
        }
    }
}
