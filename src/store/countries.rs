// src/store/countries.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Store;

/// Stable country registry row. Seeded once; the pipeline never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub iso2: String,
    pub iso3: String,
    /// IMF area code used by the SDMX fallback and reserves series.
    pub imf_code: Option<String>,
    pub currency: String,
    /// Series id in the primary macroeconomic source for this country's
    /// sovereign yield; countries without one use the SDMX fallback.
    pub primary_source_series_id: Option<String>,
}

/// The tracked economies. Argentina doubles as the parallel-market and
/// stablecoin-premium country.
const SEED: &[(&str, &str, &str, &str, &str, Option<&str>)] = &[
    ("Argentina", "AR", "ARG", "AR", "ARS", None),
    ("Brazil", "BR", "BRA", "BR", "BRL", None),
    ("Chile", "CL", "CHL", "CL", "CLP", Some("IRLTLT01CLM156N")),
    ("Colombia", "CO", "COL", "CO", "COP", Some("COLIRLTLT01STM")),
    ("Mexico", "MX", "MEX", "MX", "MXN", Some("IRLTLT01MXM156N")),
    ("Peru", "PE", "PER", "PE", "PEN", None),
    ("Turkey", "TR", "TUR", "TR", "TRY", None),
    ("Egypt", "EG", "EGY", "EG", "EGP", None),
];

impl Store {
    /// Insert any registry rows that are not present yet. Existing rows are
    /// left untouched.
    pub async fn seed_countries(&self) -> Result<()> {
        for &(name, iso2, iso3, imf, currency, series) in SEED {
            sqlx::query(
                r#"
                INSERT INTO countries (name, iso2, iso3, imf_code, currency, primary_source_series_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (iso2) DO NOTHING
                "#,
            )
            .bind(name)
            .bind(iso2)
            .bind(iso3)
            .bind(imf)
            .bind(currency)
            .bind(series)
            .execute(self.pool())
            .await
            .with_context(|| format!("seeding country {iso2}"))?;
        }
        Ok(())
    }

    pub async fn load_countries(&self) -> Result<Vec<Country>> {
        sqlx::query_as::<_, Country>("SELECT * FROM countries ORDER BY id")
            .fetch_all(self.pool())
            .await
            .context("loading countries")
    }

    pub async fn find_country_by_iso2(&self, iso2: &str) -> Result<Option<Country>> {
        sqlx::query_as::<_, Country>("SELECT * FROM countries WHERE iso2 = $1")
            .bind(iso2)
            .fetch_optional(self.pool())
            .await
            .context("looking up country by iso2")
    }
}
