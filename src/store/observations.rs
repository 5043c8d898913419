// src/store/observations.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::Store;

/// One (country, date) observation as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ObservationRow {
    pub id: i64,
    pub country_id: i64,
    pub date: NaiveDate,
    pub fx_close: Option<f64>,
    pub inflation_yoy: Option<f64>,
    pub sovereign_yield: Option<f64>,
    pub us_10y: Option<f64>,
    pub reserves_level: Option<f64>,
    pub parallel_gap: Option<f64>,
    pub fx_vol: Option<f64>,
    pub inflation: Option<f64>,
    pub risk_spread: Option<f64>,
    pub crypto_ratio: Option<f64>,
    pub reserves_change: Option<f64>,
    pub stablecoin_premium: Option<f64>,
    pub stress_score: Option<f64>,
    pub data_flags: Option<Value>,
}

/// Write-side view of a row. `None` fields are NOT overwritten on conflict
/// (the partial-upsert contract); `data_flags`, when supplied, replaces the
/// stored bag, and `updated_at` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct UpsertObservation {
    pub country_id: i64,
    pub date: NaiveDate,
    pub fx_close: Option<f64>,
    pub inflation_yoy: Option<f64>,
    pub sovereign_yield: Option<f64>,
    pub us_10y: Option<f64>,
    pub reserves_level: Option<f64>,
    pub parallel_gap: Option<f64>,
    pub fx_vol: Option<f64>,
    pub inflation: Option<f64>,
    pub risk_spread: Option<f64>,
    pub crypto_ratio: Option<f64>,
    pub reserves_change: Option<f64>,
    pub stablecoin_premium: Option<f64>,
    pub stress_score: Option<f64>,
    pub data_flags: Option<Value>,
}

impl UpsertObservation {
    pub fn new(country_id: i64, date: NaiveDate) -> Self {
        Self {
            country_id,
            date,
            ..Default::default()
        }
    }
}

/// Nullable data columns addressable by the "latest non-null" point query.
/// Names map 1:1 onto SQL columns; the enum keeps interpolation safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObsColumn {
    FxClose,
    InflationYoy,
    SovereignYield,
    Us10y,
    ReservesLevel,
    FxVol,
    Inflation,
    RiskSpread,
    CryptoRatio,
    ReservesChange,
    StablecoinPremium,
}

impl ObsColumn {
    fn as_sql(&self) -> &'static str {
        match self {
            ObsColumn::FxClose => "fx_close",
            ObsColumn::InflationYoy => "inflation_yoy",
            ObsColumn::SovereignYield => "sovereign_yield",
            ObsColumn::Us10y => "us_10y",
            ObsColumn::ReservesLevel => "reserves_level",
            ObsColumn::FxVol => "fx_vol",
            ObsColumn::Inflation => "inflation",
            ObsColumn::RiskSpread => "risk_spread",
            ObsColumn::CryptoRatio => "crypto_ratio",
            ObsColumn::ReservesChange => "reserves_change",
            ObsColumn::StablecoinPremium => "stablecoin_premium",
        }
    }
}

const UPSERT_SQL: &str = r#"
INSERT INTO daily_observations (
    country_id, date, fx_close, inflation_yoy, sovereign_yield, us_10y,
    reserves_level, parallel_gap, fx_vol, inflation, risk_spread,
    crypto_ratio, reserves_change, stablecoin_premium, stress_score, data_flags
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
ON CONFLICT (country_id, date) DO UPDATE SET
    fx_close = COALESCE(EXCLUDED.fx_close, daily_observations.fx_close),
    inflation_yoy = COALESCE(EXCLUDED.inflation_yoy, daily_observations.inflation_yoy),
    sovereign_yield = COALESCE(EXCLUDED.sovereign_yield, daily_observations.sovereign_yield),
    us_10y = COALESCE(EXCLUDED.us_10y, daily_observations.us_10y),
    reserves_level = COALESCE(EXCLUDED.reserves_level, daily_observations.reserves_level),
    parallel_gap = COALESCE(EXCLUDED.parallel_gap, daily_observations.parallel_gap),
    fx_vol = COALESCE(EXCLUDED.fx_vol, daily_observations.fx_vol),
    inflation = COALESCE(EXCLUDED.inflation, daily_observations.inflation),
    risk_spread = COALESCE(EXCLUDED.risk_spread, daily_observations.risk_spread),
    crypto_ratio = COALESCE(EXCLUDED.crypto_ratio, daily_observations.crypto_ratio),
    reserves_change = COALESCE(EXCLUDED.reserves_change, daily_observations.reserves_change),
    stablecoin_premium = COALESCE(EXCLUDED.stablecoin_premium, daily_observations.stablecoin_premium),
    stress_score = COALESCE(EXCLUDED.stress_score, daily_observations.stress_score),
    data_flags = COALESCE(EXCLUDED.data_flags, daily_observations.data_flags),
    updated_at = NOW()
"#;

impl Store {
    /// Idempotent partial upsert of one observation row.
    pub async fn upsert_observation(&self, obs: &UpsertObservation) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(obs.country_id)
            .bind(obs.date)
            .bind(obs.fx_close)
            .bind(obs.inflation_yoy)
            .bind(obs.sovereign_yield)
            .bind(obs.us_10y)
            .bind(obs.reserves_level)
            .bind(obs.parallel_gap)
            .bind(obs.fx_vol)
            .bind(obs.inflation)
            .bind(obs.risk_spread)
            .bind(obs.crypto_ratio)
            .bind(obs.reserves_change)
            .bind(obs.stablecoin_premium)
            .bind(obs.stress_score)
            .bind(&obs.data_flags)
            .execute(self.pool())
            .await
            .with_context(|| {
                format!(
                    "upserting observation country={} date={}",
                    obs.country_id, obs.date
                )
            })?;
        Ok(())
    }

    /// Batch variant used by the backfill reducers.
    pub async fn upsert_observations(&self, batch: &[UpsertObservation]) -> Result<()> {
        for obs in batch {
            self.upsert_observation(obs).await?;
        }
        Ok(())
    }

    /// Latest non-null value of one column for a country, with its row date.
    /// This is the forward-fill priming read.
    pub async fn last_known(
        &self,
        country_id: i64,
        column: ObsColumn,
    ) -> Result<Option<(NaiveDate, f64)>> {
        let sql = format!(
            "SELECT date, {col} FROM daily_observations
             WHERE country_id = $1 AND {col} IS NOT NULL
             ORDER BY date DESC LIMIT 1",
            col = column.as_sql()
        );
        let row: Option<(NaiveDate, f64)> = sqlx::query_as(&sql)
            .bind(country_id)
            .fetch_optional(self.pool())
            .await
            .with_context(|| format!("last_known {}", column.as_sql()))?;
        Ok(row)
    }

    /// The `n` most recent non-null FX closes strictly before `date`,
    /// returned in ascending date order (ready for rolling math).
    pub async fn fx_closes_before(
        &self,
        country_id: i64,
        date: NaiveDate,
        n: i64,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let mut rows: Vec<(NaiveDate, f64)> = sqlx::query_as(
            "SELECT date, fx_close FROM daily_observations
             WHERE country_id = $1 AND date < $2 AND fx_close IS NOT NULL
             ORDER BY date DESC LIMIT $3",
        )
        .bind(country_id)
        .bind(date)
        .bind(n)
        .fetch_all(self.pool())
        .await
        .context("fx_closes_before")?;
        rows.reverse();
        Ok(rows)
    }

    /// Most recent non-null reserves level with a row date in `[from, to]`.
    pub async fn reserves_level_in_window(
        &self,
        country_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<f64>> {
        let row: Option<(f64,)> = sqlx::query_as(
            "SELECT reserves_level FROM daily_observations
             WHERE country_id = $1 AND date BETWEEN $2 AND $3
               AND reserves_level IS NOT NULL
             ORDER BY date DESC LIMIT 1",
        )
        .bind(country_id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool())
        .await
        .context("reserves_level_in_window")?;
        Ok(row.map(|(v,)| v))
    }

    /// Newest scored row for a country.
    pub async fn latest_scored(&self, country_id: i64) -> Result<Option<ObservationRow>> {
        sqlx::query_as::<_, ObservationRow>(
            "SELECT id, country_id, date, fx_close, inflation_yoy, sovereign_yield, us_10y,
                    reserves_level, parallel_gap, fx_vol, inflation, risk_spread, crypto_ratio,
                    reserves_change, stablecoin_premium, stress_score, data_flags
             FROM daily_observations
             WHERE country_id = $1 AND stress_score IS NOT NULL
             ORDER BY date DESC LIMIT 1",
        )
        .bind(country_id)
        .fetch_optional(self.pool())
        .await
        .context("latest_scored")
    }

    /// Newest scored row at or before a cutoff date (delta baselines).
    pub async fn scored_on_or_before(
        &self,
        country_id: i64,
        cutoff: NaiveDate,
    ) -> Result<Option<ObservationRow>> {
        sqlx::query_as::<_, ObservationRow>(
            "SELECT id, country_id, date, fx_close, inflation_yoy, sovereign_yield, us_10y,
                    reserves_level, parallel_gap, fx_vol, inflation, risk_spread, crypto_ratio,
                    reserves_change, stablecoin_premium, stress_score, data_flags
             FROM daily_observations
             WHERE country_id = $1 AND stress_score IS NOT NULL AND date <= $2
             ORDER BY date DESC LIMIT 1",
        )
        .bind(country_id)
        .bind(cutoff)
        .fetch_optional(self.pool())
        .await
        .context("scored_on_or_before")
    }

    /// Up to the last `n` scored rows, oldest first.
    pub async fn scored_history(&self, country_id: i64, n: i64) -> Result<Vec<ObservationRow>> {
        let mut rows = sqlx::query_as::<_, ObservationRow>(
            "SELECT id, country_id, date, fx_close, inflation_yoy, sovereign_yield, us_10y,
                    reserves_level, parallel_gap, fx_vol, inflation, risk_spread, crypto_ratio,
                    reserves_change, stablecoin_premium, stress_score, data_flags
             FROM daily_observations
             WHERE country_id = $1 AND stress_score IS NOT NULL
             ORDER BY date DESC LIMIT $2",
        )
        .bind(country_id)
        .bind(n)
        .fetch_all(self.pool())
        .await
        .context("scored_history")?;
        rows.reverse();
        Ok(rows)
    }

    /// Every non-null (date, value) of one column for a country, ascending,
    /// optionally bounded below. Input to the normalization builder.
    pub async fn metric_values(
        &self,
        country_id: i64,
        column: ObsColumn,
        from: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let sql = format!(
            "SELECT date, {col} FROM daily_observations
             WHERE country_id = $1 AND {col} IS NOT NULL AND ($2::date IS NULL OR date >= $2)
             ORDER BY date ASC",
            col = column.as_sql()
        );
        sqlx::query_as(&sql)
            .bind(country_id)
            .bind(from)
            .fetch_all(self.pool())
            .await
            .with_context(|| format!("metric_values {}", column.as_sql()))
    }
}
