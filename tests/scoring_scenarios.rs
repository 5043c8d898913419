//! End-to-end scoring scenarios exercised through the public library surface:
//! the weighted redistribution, its audit flags, and the component map the
//! read side republishes.

use macro_stress::scoring::{
    component_scores, compute_score, MetricName, NormBounds, NormMap, RawMetrics,
};
use serde_json::Value;

fn norms() -> NormMap {
    let mut n = NormMap::new();
    n.insert(MetricName::FxVol, NormBounds { lo: 0.01, hi: 0.04 });
    n.insert(MetricName::Inflation, NormBounds { lo: 0.0, hi: 5.0 });
    n.insert(MetricName::RiskSpread, NormBounds { lo: 0.0, hi: 6.0 });
    n.insert(MetricName::CryptoRatio, NormBounds { lo: 0.1, hi: 0.5 });
    n.insert(
        MetricName::ReservesChange,
        NormBounds {
            lo: -10.0,
            hi: 10.0,
        },
    );
    n.insert(
        MetricName::StablecoinPremium,
        NormBounds { lo: 0.0, hi: 50.0 },
    );
    n
}

#[test]
fn brazil_style_five_metric_row() {
    let raw = RawMetrics {
        fx_vol: Some(0.030),
        inflation: Some(1.5),
        risk_spread: Some(3.0),
        crypto_ratio: Some(0.25),
        reserves_change: Some(-5.0),
        stablecoin_premium: None,
    };
    let result = compute_score(&raw, &norms()).unwrap();

    // Normalized components 2/3, 0.3, 0.5, 0.375, 0.25 over availableWeight
    // 0.85.
    assert_eq!(result.score, 45.8);
    assert!(result.score >= 0.0 && result.score <= 100.0);
    assert_eq!(result.flags.get("partial"), Some(&Value::Bool(true)));
    assert!(result.flags.get("low_confidence").is_none());

    let comps = component_scores(&raw, &norms());
    assert_eq!(comps["fx_vol"], Some(66.7));
    assert_eq!(comps["inflation"], Some(30.0));
    assert_eq!(comps["risk_spread"], Some(50.0));
    assert_eq!(comps["crypto_ratio"], Some(37.5));
    assert_eq!(comps["reserves_change"], Some(25.0));
    assert_eq!(comps["stablecoin_premium"], None);
}

#[test]
fn two_metric_country_redistributes_and_warns() {
    let raw = RawMetrics {
        fx_vol: Some(0.05),
        inflation: Some(3.0),
        ..Default::default()
    };
    let result = compute_score(&raw, &norms()).unwrap();

    // availableWeight 0.45 < 0.5.
    assert_eq!(result.score, 82.2);
    assert_eq!(result.flags.get("low_confidence"), Some(&Value::Bool(true)));

    let missing: Vec<&str> = result.flags["missing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        missing,
        vec![
            "risk_spread",
            "crypto_ratio",
            "reserves_change",
            "stablecoin_premium"
        ]
    );
}

#[test]
fn degenerate_history_scores_dead_center() {
    let mut n = NormMap::new();
    n.insert(MetricName::FxVol, NormBounds { lo: 0.02, hi: 0.02 });
    let raw = RawMetrics {
        fx_vol: Some(0.02),
        ..Default::default()
    };
    let result = compute_score(&raw, &n).unwrap();
    assert_eq!(result.score, 50.0);
    assert_eq!(result.flags.get("low_confidence"), Some(&Value::Bool(true)));
}

#[test]
fn empty_record_is_unscoreable_not_zero() {
    assert!(compute_score(&RawMetrics::default(), &norms()).is_none());
}

#[test]
fn all_metrics_present_means_no_partial_flag() {
    let raw = RawMetrics {
        fx_vol: Some(0.02),
        inflation: Some(2.0),
        risk_spread: Some(3.0),
        crypto_ratio: Some(0.3),
        reserves_change: Some(1.0),
        stablecoin_premium: Some(10.0),
    };
    let result = compute_score(&raw, &norms()).unwrap();
    assert!(result.flags.get("partial").is_none());
    assert!(result.flags.get("missing").is_none());
    assert!(result.flags.get("low_confidence").is_none());
    assert!(result.score >= 0.0 && result.score <= 100.0);
}
