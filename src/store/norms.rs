// src/store/norms.rs
use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Store;
use crate::scoring::{MetricName, NormBounds, NormMap};

/// Method tag stored alongside every clamp row.
pub const NORM_METHOD: &str = "p5_p95_clamped";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NormParamRow {
    pub id: i64,
    pub country_id: i64,
    pub metric_name: String,
    pub min_val: f64,
    pub max_val: f64,
    pub method: String,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
}

impl Store {
    /// All normalization params indexed country -> metric -> bounds, the
    /// shape the scoring engine consumes. Rows whose metric name is unknown
    /// or whose bounds are degenerate are dropped with a warning; the engine
    /// then treats the metric as having no norm rather than silently scoring
    /// everything 0.5.
    pub async fn load_norm_maps(&self) -> Result<HashMap<i64, NormMap>> {
        let rows = sqlx::query_as::<_, NormParamRow>("SELECT * FROM normalization_params")
            .fetch_all(self.pool())
            .await
            .context("loading normalization params")?;

        let mut out: HashMap<i64, NormMap> = HashMap::new();
        for row in rows {
            let Some(metric) = MetricName::parse(&row.metric_name) else {
                tracing::warn!(metric = %row.metric_name, "unknown metric_name in normalization_params");
                continue;
            };
            if row.max_val <= row.min_val {
                tracing::warn!(
                    country_id = row.country_id,
                    metric = %row.metric_name,
                    min = row.min_val,
                    max = row.max_val,
                    "degenerate normalization bounds rejected at load"
                );
                continue;
            }
            out.entry(row.country_id).or_default().insert(
                metric,
                NormBounds {
                    lo: row.min_val,
                    hi: row.max_val,
                },
            );
        }
        Ok(out)
    }

    /// Upsert one (country, metric) clamp row. The window bounds record the
    /// exact observation dates that fed the percentiles.
    pub async fn upsert_norm(
        &self,
        country_id: i64,
        metric: MetricName,
        min_val: f64,
        max_val: f64,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO normalization_params
                (country_id, metric_name, min_val, max_val, method, window_start, window_end, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (country_id, metric_name) DO UPDATE SET
                min_val = EXCLUDED.min_val,
                max_val = EXCLUDED.max_val,
                method = EXCLUDED.method,
                window_start = EXCLUDED.window_start,
                window_end = EXCLUDED.window_end,
                updated_at = NOW()
            "#,
        )
        .bind(country_id)
        .bind(metric.as_str())
        .bind(min_val)
        .bind(max_val)
        .bind(NORM_METHOD)
        .bind(window_start)
        .bind(window_end)
        .execute(self.pool())
        .await
        .with_context(|| format!("upserting norm {} for country {country_id}", metric.as_str()))?;
        Ok(())
    }
}
