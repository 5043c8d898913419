//! Annual CPI adapter: metadata-wrapped payloads, null years, ordering.

use httpmock::{Method::GET, MockServer};
use serde_json::json;

use macro_stress::sources::build_client;
use macro_stress::sources::inflation::{latest_with_baseline, WorldBank};

#[tokio::test]
async fn annual_series_drops_nulls_and_sorts_ascending() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/country/BR/indicator/FP.CPI.TOTL.ZG")
                .query_param("format", "json");
            then.status(200).json_body(json!([
                {"page": 1, "pages": 1, "per_page": 100, "total": 4},
                [
                    {"date": "2025", "value": null},
                    {"date": "2024", "value": 4.37},
                    {"date": "2023", "value": 4.59},
                    {"date": "2022", "value": 9.28}
                ]
            ]));
        })
        .await;

    let wb = WorldBank::new(build_client()).base_url(server.base_url());
    let series = wb.annual_cpi_yoy("BR").await.unwrap();

    let years: Vec<i32> = series.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2022, 2023, 2024]);

    let (latest, baseline) = latest_with_baseline(&series).unwrap();
    assert_eq!(latest.year, 2024);
    assert!((latest.yoy - 4.37).abs() < 1e-9);
    assert_eq!(baseline, Some(9.28));
}

#[tokio::test]
async fn all_null_series_is_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/country/EG/indicator/FP.CPI.TOTL.ZG");
            then.status(200).json_body(json!([
                {"page": 1},
                [{"date": "2024", "value": null}]
            ]));
        })
        .await;

    let wb = WorldBank::new(build_client()).base_url(server.base_url());
    assert!(wb.annual_cpi_yoy("EG").await.is_none());
}
