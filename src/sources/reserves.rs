// src/sources/reserves.rs
use chrono::NaiveDate;

use super::imf::{ImfSdmx, RESERVES_USD};
use crate::store::Country;

/// First year requested for the reserves series.
pub const RESERVES_START_YEAR: i32 = 2010;

/// Latest non-null monthly total-reserves level (USD).
pub async fn latest_reserves(imf: &ImfSdmx, country: &Country) -> Option<(NaiveDate, f64)> {
    let area = country.imf_code.as_deref().unwrap_or(&country.iso2);
    imf.latest_monthly(area, RESERVES_USD, RESERVES_START_YEAR)
        .await
}

/// Full monthly reserves history for the backfill reducer, oldest first.
pub async fn reserves_history(
    imf: &ImfSdmx,
    country: &Country,
) -> Option<Vec<(NaiveDate, f64)>> {
    let area = country.imf_code.as_deref().unwrap_or(&country.iso2);
    imf.monthly_series(area, RESERVES_USD, RESERVES_START_YEAR)
        .await
}
