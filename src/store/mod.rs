//! # Persistence Layer
//! Postgres access behind a single `Store` handle. Writes are idempotent
//! partial-column upserts keyed on (country, date); reads are point lookups
//! and small range scans used by the orchestrator and the read API.
//!
//! The pool permits concurrent reads; the orchestrator is the only writer
//! and runs serially per scheduled tick.

pub mod countries;
pub mod norms;
pub mod observations;
pub mod run_log;

pub use countries::Country;
pub use norms::NormParamRow;
pub use observations::{ObsColumn, ObservationRow, UpsertObservation};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect and run the idempotent schema bootstrap.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .context("connecting to postgres")?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool (tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS countries (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                iso2 TEXT NOT NULL UNIQUE,
                iso3 TEXT NOT NULL UNIQUE,
                imf_code TEXT,
                currency TEXT NOT NULL,
                primary_source_series_id TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("ensure countries table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_observations (
                id BIGSERIAL PRIMARY KEY,
                country_id BIGINT NOT NULL REFERENCES countries(id) ON DELETE CASCADE,
                date DATE NOT NULL,
                fx_close DOUBLE PRECISION,
                inflation_yoy DOUBLE PRECISION,
                sovereign_yield DOUBLE PRECISION,
                us_10y DOUBLE PRECISION,
                reserves_level DOUBLE PRECISION,
                parallel_gap DOUBLE PRECISION,
                fx_vol DOUBLE PRECISION,
                inflation DOUBLE PRECISION,
                risk_spread DOUBLE PRECISION,
                crypto_ratio DOUBLE PRECISION,
                reserves_change DOUBLE PRECISION,
                stablecoin_premium DOUBLE PRECISION,
                stress_score DOUBLE PRECISION,
                data_flags JSONB,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (country_id, date)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("ensure daily_observations table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_daily_obs_country_date
             ON daily_observations (country_id, date DESC)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_daily_obs_date ON daily_observations (date DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS normalization_params (
                id BIGSERIAL PRIMARY KEY,
                country_id BIGINT NOT NULL REFERENCES countries(id) ON DELETE CASCADE,
                metric_name TEXT NOT NULL,
                min_val DOUBLE PRECISION NOT NULL,
                max_val DOUBLE PRECISION NOT NULL,
                method TEXT NOT NULL,
                window_start DATE,
                window_end DATE,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (country_id, metric_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("ensure normalization_params table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS run_log (
                id BIGSERIAL PRIMARY KEY,
                run_date DATE NOT NULL,
                status TEXT NOT NULL,
                detail JSONB,
                duration_ms BIGINT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("ensure run_log table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_run_log_date ON run_log (run_date DESC)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
