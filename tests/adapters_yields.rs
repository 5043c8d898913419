//! Sovereign yield routing (primary source vs SDMX fallback) and risk-free
//! placeholder handling.

use httpmock::{Method::GET, MockServer};
use serde_json::json;

use macro_stress::sources::build_client;
use macro_stress::sources::fred::FredSeries;
use macro_stress::sources::imf::ImfSdmx;
use macro_stress::sources::sovereign::{latest_yield, YieldSource};
use macro_stress::store::Country;

fn country(iso2: &str, series: Option<&str>) -> Country {
    Country {
        id: 1,
        name: "Testland".into(),
        iso2: iso2.into(),
        iso3: format!("{iso2}X"),
        imf_code: Some(iso2.into()),
        currency: "TST".into(),
        primary_source_series_id: series.map(str::to_string),
    }
}

#[tokio::test]
async fn risk_free_skips_unpublished_placeholder_days() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/fred/series/observations")
                .query_param("series_id", "DGS10")
                .query_param("sort_order", "desc");
            then.status(200).json_body(json!({
                "observations": [
                    {"date": "2026-08-02", "value": "."},
                    {"date": "2026-08-01", "value": "."},
                    {"date": "2026-07-31", "value": "4.23"}
                ]
            }));
        })
        .await;

    let fred = FredSeries::new(build_client(), "k".into()).base_url(server.base_url());
    let (date, value) = fred.latest_observation("DGS10").await.unwrap();
    assert_eq!(date.to_string(), "2026-07-31");
    assert!((value - 4.23).abs() < 1e-9);
}

#[tokio::test]
async fn primary_series_wins_when_present() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/fred/series/observations")
                .query_param("series_id", "IRLTLT01MXM156N");
            then.status(200).json_body(json!({
                "observations": [{"date": "2026-07-01", "value": "9.10"}]
            }));
        })
        .await;

    let fred = FredSeries::new(build_client(), "k".into()).base_url(server.base_url());
    let imf = ImfSdmx::new(build_client()).base_url(server.base_url());

    let (_, value, source) = latest_yield(&fred, &imf, &country("MX", Some("IRLTLT01MXM156N")))
        .await
        .unwrap();
    assert_eq!(source, YieldSource::Primary);
    assert!((value - 9.10).abs() < 1e-9);
}

#[tokio::test]
async fn fallback_is_used_without_a_primary_series() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/CompactData/IFS/M.PE.FIGB_PA");
            then.status(200).json_body(json!({
                "CompactData": {"DataSet": {"Series": {"Obs": [
                    {"@TIME_PERIOD": "2026-05", "@OBS_VALUE": "6.80"},
                    {"@TIME_PERIOD": "2026-06", "@OBS_VALUE": 7.05}
                ]}}}
            }));
        })
        .await;

    let fred = FredSeries::new(build_client(), "k".into()).base_url(server.base_url());
    let imf = ImfSdmx::new(build_client()).base_url(server.base_url());

    let (date, value, source) = latest_yield(&fred, &imf, &country("PE", None)).await.unwrap();
    assert_eq!(source, YieldSource::Fallback);
    assert_eq!(date.to_string(), "2026-06-01");
    assert!((value - 7.05).abs() < 1e-9);
}

#[tokio::test]
async fn missing_fallback_series_is_a_quiet_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/CompactData/IFS/M.EG.FIGB_PA");
            then.status(200)
                .json_body(json!({"CompactData": {"DataSet": null}}));
        })
        .await;

    let fred = FredSeries::new(build_client(), "k".into()).base_url(server.base_url());
    let imf = ImfSdmx::new(build_client()).base_url(server.base_url());

    assert!(latest_yield(&fred, &imf, &country("EG", None)).await.is_none());
}
