// src/store/run_log.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;

use super::Store;

impl Store {
    /// Append one orchestrator execution record.
    pub async fn insert_run(
        &self,
        run_date: NaiveDate,
        status: &str,
        detail: Value,
        duration_ms: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO run_log (run_date, status, detail, duration_ms)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(run_date)
        .bind(status)
        .bind(detail)
        .bind(duration_ms)
        .execute(self.pool())
        .await
        .context("inserting run_log row")?;
        Ok(())
    }

    /// Whether a run for this date already produced data. Both `success` and
    /// `partial` block a re-run (a partial run updated at least one country);
    /// `error` does not, so a failed morning run can be retried.
    pub async fn run_already_completed(&self, run_date: NaiveDate) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM run_log
             WHERE run_date = $1 AND status IN ('success', 'partial')
             LIMIT 1",
        )
        .bind(run_date)
        .fetch_optional(self.pool())
        .await
        .context("checking run_log for completed run")?;
        Ok(row.is_some())
    }
}
