//! FX adapter behavior against a mock provider: happy path, provider-level
//! error payloads, and the parallel-market gap calculation.

use httpmock::{Method::GET, MockServer};
use serde_json::json;

use macro_stress::sources::fx::{Bluelytics, TwelveData};
use macro_stress::sources::build_client;

fn fx_pointing_to(server: &MockServer) -> TwelveData {
    TwelveData::new(build_client(), "test_key".into()).base_url(server.base_url())
}

#[tokio::test]
async fn latest_close_takes_most_recent_bar() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/time_series")
                .query_param("symbol", "USD/BRL")
                .query_param("interval", "1day")
                .query_param("apikey", "test_key");
            then.status(200).json_body(json!({
                "meta": {"symbol": "USD/BRL"},
                "values": [
                    {"datetime": "2026-07-31", "close": "5.4321", "open": "5.40"},
                    {"datetime": "2026-07-30", "close": "5.4000", "open": "5.38"}
                ],
                "status": "ok"
            }));
        })
        .await;

    let fx = fx_pointing_to(&server);
    let close = fx.latest_close("BRL").await.unwrap();
    assert_eq!(close.date.to_string(), "2026-07-31");
    assert!((close.close - 5.4321).abs() < 1e-9);
    m.assert_async().await;
}

#[tokio::test]
async fn provider_error_payload_becomes_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/time_series");
            then.status(200).json_body(json!({
                "status": "error",
                "message": "You have run out of API credits"
            }));
        })
        .await;

    let fx = fx_pointing_to(&server);
    assert!(fx.latest_close("BRL").await.is_none());
}

#[tokio::test]
async fn http_failure_becomes_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/time_series");
            then.status(500);
        })
        .await;

    let fx = fx_pointing_to(&server);
    assert!(fx.latest_close("ARS").await.is_none());
}

#[tokio::test]
async fn daily_series_is_oldest_first_and_drops_bad_closes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/time_series");
            then.status(200).json_body(json!({
                "values": [
                    {"datetime": "2026-07-31", "close": "5.44"},
                    {"datetime": "2026-07-30", "close": "0.0"},
                    {"datetime": "2026-07-29", "close": "5.40"}
                ],
                "status": "ok"
            }));
        })
        .await;

    let fx = fx_pointing_to(&server);
    let series = fx.daily_series("BRL", 3).await.unwrap();
    assert_eq!(series.len(), 2);
    assert!(series[0].date < series[1].date);
}

#[tokio::test]
async fn parallel_gap_is_blue_over_official_percent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/latest");
            then.status(200).json_body(json!({
                "oficial": {"value_avg": 1000.0, "value_sell": 1000.0, "value_buy": 980.0},
                "blue": {"value_avg": 1290.0, "value_sell": 1300.0, "value_buy": 1280.0},
                "last_update": "2026-08-01T12:00:00Z"
            }));
        })
        .await;

    let blue = Bluelytics::new(build_client()).base_url(server.base_url());
    let gap = blue.parallel_gap().await.unwrap();
    assert!((gap - 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn parallel_gap_rejects_zero_official_rate() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v2/latest");
            then.status(200).json_body(json!({
                "oficial": {"value_sell": 0.0},
                "blue": {"value_sell": 1300.0}
            }));
        })
        .await;

    let blue = Bluelytics::new(build_client()).base_url(server.base_url());
    assert!(blue.parallel_gap().await.is_none());
}
