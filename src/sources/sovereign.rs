// src/sources/sovereign.rs
use chrono::NaiveDate;

use super::fred::FredSeries;
use super::imf::{ImfSdmx, GOV_BOND_YIELD};
use crate::store::Country;

/// First year requested from the SDMX fallback.
pub const SOVEREIGN_START_YEAR: i32 = 2010;

/// Where a sovereign yield observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldSource {
    Primary,
    Fallback,
}

/// Latest sovereign yield for a country: the primary source when the country
/// has a series there, otherwise the SDMX fallback. `None` is common for
/// countries absent from both and simply leaves the metric missing.
pub async fn latest_yield(
    fred: &FredSeries,
    imf: &ImfSdmx,
    country: &Country,
) -> Option<(NaiveDate, f64, YieldSource)> {
    if let Some(series_id) = &country.primary_source_series_id {
        if let Some((date, value)) = fred.latest_observation(series_id).await {
            return Some((date, value, YieldSource::Primary));
        }
        tracing::debug!(
            iso2 = %country.iso2,
            series_id = %series_id,
            "primary sovereign series unavailable, trying fallback"
        );
    }
    let area = country.imf_code.as_deref().unwrap_or(&country.iso2);
    imf.latest_monthly(area, GOV_BOND_YIELD, SOVEREIGN_START_YEAR)
        .await
        .map(|(date, value)| (date, value, YieldSource::Fallback))
}

/// Full monthly yield history for the backfill reducer, oldest first.
pub async fn yield_history(
    fred: &FredSeries,
    imf: &ImfSdmx,
    country: &Country,
) -> Option<Vec<(NaiveDate, f64)>> {
    if let Some(series_id) = &country.primary_source_series_id {
        if let Some(series) = fred
            .series(series_id, NaiveDate::from_ymd_opt(SOVEREIGN_START_YEAR, 1, 1))
            .await
        {
            return Some(series);
        }
    }
    let area = country.imf_code.as_deref().unwrap_or(&country.iso2);
    imf.monthly_series(area, GOV_BOND_YIELD, SOVEREIGN_START_YEAR)
        .await
}
