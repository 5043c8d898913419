//! Stablecoin premium: median of exchange total-asks against the official
//! rate, with the two-exchange minimum.

use httpmock::{Method::GET, MockServer};
use serde_json::json;

use macro_stress::sources::build_client;
use macro_stress::sources::stablecoin::Criptoya;

fn criptoya_pointing_to(server: &MockServer) -> Criptoya {
    Criptoya::new(build_client()).base_url(server.base_url())
}

#[tokio::test]
async fn premium_is_median_total_ask_over_official() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/usdt/ars/1");
            then.status(200).json_body(json!({
                "binance": {"ask": 1250.0, "totalAsk": 1260.0, "bid": 1240.0, "totalBid": 1230.0, "time": 1754121600},
                "ripio":   {"ask": 1280.0, "totalAsk": 1300.0, "bid": 1255.0, "totalBid": 1245.0, "time": 1754121600},
                "lemon":   {"ask": 1270.0, "totalAsk": 1280.0, "bid": 1250.0, "totalBid": 1240.0, "time": 1754121600}
            }));
        })
        .await;

    // Median totalAsk = 1280; official 1000 -> 28%.
    let premium = criptoya_pointing_to(&server).premium(1000.0).await.unwrap();
    assert!((premium - 28.0).abs() < 1e-9);
}

#[tokio::test]
async fn fewer_than_two_exchanges_is_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/usdt/ars/1");
            then.status(200).json_body(json!({
                "binance": {"totalAsk": 1260.0},
                "broken": {"totalAsk": null}
            }));
        })
        .await;

    assert!(criptoya_pointing_to(&server).premium(1000.0).await.is_none());
}

#[tokio::test]
async fn non_positive_official_rate_is_rejected() {
    let server = MockServer::start_async().await;
    let criptoya = criptoya_pointing_to(&server);
    assert!(criptoya.premium(0.0).await.is_none());
    assert!(criptoya.premium(-1.0).await.is_none());
}
