//! # Pipeline
//! The scheduled daily run, the offline backfill reducers, and the
//! normalization builder. All three write through the same partial-upsert
//! path so a later pass never erases earlier raw columns.

pub mod backfill;
pub mod daily;
pub mod norms_builder;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Earliest calendar date any reducer materializes rows for (and the lower
/// bound of every non-crypto normalization window).
pub const HISTORY_ANCHOR: NaiveDate = match NaiveDate::from_ymd_opt(2010, 1, 1) {
    Some(d) => d,
    None => panic!("static anchor date"),
};

/// Terminal status of one orchestrator execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Error => "error",
        }
    }
}

/// What one daily run did, returned to the scheduler trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRunOutcome {
    pub run_date: NaiveDate,
    pub status: RunStatus,
    /// True when the idempotency guard short-circuited the run.
    pub skipped: bool,
    pub countries_updated: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl DailyRunOutcome {
    pub(crate) fn skipped(run_date: NaiveDate, duration_ms: u64) -> Self {
        Self {
            run_date,
            status: RunStatus::Success,
            skipped: true,
            countries_updated: 0,
            errors: Vec::new(),
            duration_ms,
        }
    }
}
