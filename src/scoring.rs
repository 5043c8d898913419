//! # Scoring Engine
//! Pure logic that maps a raw metric tuple plus per-country normalization
//! bounds to a 0–100 stress score. No I/O, suitable for unit tests and
//! offline evaluation.
//!
//! Missing metrics do not fail the call: their canonical weight is
//! redistributed across the metrics that are present, and the redistribution
//! is recorded in the audit flags (`partial`, `missing`, `low_confidence`).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::mathx::{clamp_normalize, round1};

/// Redistribution below this share of canonical weight marks the score as
/// low-confidence.
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// The six scored metrics. Order is canonical and stable (flag lists and
/// component maps follow it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricName {
    FxVol,
    Inflation,
    RiskSpread,
    CryptoRatio,
    ReservesChange,
    StablecoinPremium,
}

impl MetricName {
    pub const ALL: [MetricName; 6] = [
        MetricName::FxVol,
        MetricName::Inflation,
        MetricName::RiskSpread,
        MetricName::CryptoRatio,
        MetricName::ReservesChange,
        MetricName::StablecoinPremium,
    ];

    /// Storage name, used as `normalization_params.metric_name` and in flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FxVol => "fx_vol",
            MetricName::Inflation => "inflation",
            MetricName::RiskSpread => "risk_spread",
            MetricName::CryptoRatio => "crypto_ratio",
            MetricName::ReservesChange => "reserves_change",
            MetricName::StablecoinPremium => "stablecoin_premium",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == s)
    }

    /// Canonical weight. The six weights sum to 1.0.
    pub fn weight(&self) -> f64 {
        match self {
            MetricName::FxVol => 0.25,
            MetricName::Inflation => 0.20,
            MetricName::RiskSpread => 0.20,
            MetricName::CryptoRatio => 0.10,
            MetricName::ReservesChange => 0.10,
            MetricName::StablecoinPremium => 0.15,
        }
    }
}

/// One scoring call's input: a nullable value per metric. Never persisted
/// as-is; absence is an explicit `None`, never a default zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetrics {
    pub fx_vol: Option<f64>,
    pub inflation: Option<f64>,
    pub risk_spread: Option<f64>,
    pub crypto_ratio: Option<f64>,
    pub reserves_change: Option<f64>,
    pub stablecoin_premium: Option<f64>,
}

impl RawMetrics {
    pub fn get(&self, metric: MetricName) -> Option<f64> {
        match metric {
            MetricName::FxVol => self.fx_vol,
            MetricName::Inflation => self.inflation,
            MetricName::RiskSpread => self.risk_spread,
            MetricName::CryptoRatio => self.crypto_ratio,
            MetricName::ReservesChange => self.reserves_change,
            MetricName::StablecoinPremium => self.stablecoin_premium,
        }
    }
}

/// p5/p95 clamp bounds for one (country, metric).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormBounds {
    pub lo: f64,
    pub hi: f64,
}

/// Per-country normalization lookup fed to the engine.
pub type NormMap = BTreeMap<MetricName, NormBounds>;

/// Outcome of a successful scoring call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// Final stress score in [0, 100], one decimal digit.
    pub score: f64,
    /// Audit flags: `partial`, `missing`, `low_confidence`,
    /// `<metric>_norm_missing`. Merged by the caller with adapter flags.
    pub flags: Map<String, Value>,
}

/// Compute the stress score for one raw-metric record.
///
/// Returns `None` when no metric is both present and normalizable — a row
/// that cannot be scored, which is distinct from a score of 0.
pub fn compute_score(raw: &RawMetrics, norms: &NormMap) -> Option<ScoreResult> {
    let mut components: Vec<(MetricName, f64)> = Vec::with_capacity(MetricName::ALL.len());
    let mut missing: Vec<&'static str> = Vec::new();
    let mut norm_missing: Vec<&'static str> = Vec::new();

    for metric in MetricName::ALL {
        match (raw.get(metric), norms.get(&metric)) {
            (Some(v), Some(b)) => components.push((metric, clamp_normalize(v, b.lo, b.hi))),
            (Some(_), None) => {
                norm_missing.push(metric.as_str());
                missing.push(metric.as_str());
            }
            (None, _) => missing.push(metric.as_str()),
        }
    }

    let available_weight: f64 = components.iter().map(|(m, _)| m.weight()).sum();
    if available_weight == 0.0 {
        return None;
    }

    let weighted: f64 = components
        .iter()
        .map(|(m, c)| (m.weight() / available_weight) * c)
        .sum();
    let score = round1(100.0 * weighted);

    let mut flags = Map::new();
    if !missing.is_empty() {
        flags.insert("partial".into(), Value::Bool(true));
        flags.insert(
            "missing".into(),
            Value::Array(missing.iter().map(|m| Value::String((*m).into())).collect()),
        );
    }
    if available_weight < LOW_CONFIDENCE_THRESHOLD {
        flags.insert("low_confidence".into(), Value::Bool(true));
    }
    for m in norm_missing {
        flags.insert(format!("{m}_norm_missing"), Value::Bool(true));
    }

    Some(ScoreResult { score, flags })
}

/// Per-metric normalized scores (0–100, one decimal) for presentation.
///
/// `None` for metrics lacking either a raw value or a norm bound.
pub fn component_scores(raw: &RawMetrics, norms: &NormMap) -> BTreeMap<&'static str, Option<f64>> {
    let mut out = BTreeMap::new();
    for metric in MetricName::ALL {
        let score = match (raw.get(metric), norms.get(&metric)) {
            (Some(v), Some(b)) => Some(round1(100.0 * clamp_normalize(v, b.lo, b.hi))),
            _ => None,
        };
        out.insert(metric.as_str(), score);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(lo: f64, hi: f64) -> NormBounds {
        NormBounds { lo, hi }
    }

    fn full_norms() -> NormMap {
        let mut n = NormMap::new();
        n.insert(MetricName::FxVol, bounds(0.01, 0.04));
        n.insert(MetricName::Inflation, bounds(0.0, 5.0));
        n.insert(MetricName::RiskSpread, bounds(0.0, 6.0));
        n.insert(MetricName::CryptoRatio, bounds(0.1, 0.5));
        n.insert(MetricName::ReservesChange, bounds(-10.0, 10.0));
        n.insert(MetricName::StablecoinPremium, bounds(0.0, 50.0));
        n
    }

    #[test]
    fn canonical_weights_sum_to_one() {
        let total: f64 = MetricName::ALL.iter().map(|m| m.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn five_metric_country_redistributes_over_085() {
        // Stablecoin premium not applicable; the remaining five carry 0.85 of
        // canonical weight and get scaled back up to 1.
        let raw = RawMetrics {
            fx_vol: Some(0.030),
            inflation: Some(1.5),
            risk_spread: Some(3.0),
            crypto_ratio: Some(0.25),
            reserves_change: Some(-5.0),
            stablecoin_premium: None,
        };
        let r = compute_score(&raw, &full_norms()).unwrap();

        // Components: 2/3, 0.300, 0.500, 0.375, 0.250.
        let expected = 100.0
            * (0.25 * (2.0 / 3.0) + 0.20 * 0.300 + 0.20 * 0.500 + 0.10 * 0.375 + 0.10 * 0.250)
            / 0.85;
        assert_eq!(r.score, crate::mathx::round1(expected));
        assert_eq!(r.score, 45.8);

        assert_eq!(r.flags.get("partial"), Some(&Value::Bool(true)));
        assert_eq!(
            r.flags.get("missing").unwrap(),
            &serde_json::json!(["stablecoin_premium"])
        );
        assert!(r.flags.get("low_confidence").is_none());
    }

    #[test]
    fn adjusted_weights_always_sum_to_one() {
        let raw = RawMetrics {
            fx_vol: Some(0.02),
            inflation: None,
            risk_spread: Some(1.0),
            crypto_ratio: None,
            reserves_change: Some(0.0),
            stablecoin_premium: None,
        };
        let norms = full_norms();
        let available: Vec<MetricName> = MetricName::ALL
            .iter()
            .copied()
            .filter(|m| raw.get(*m).is_some() && norms.contains_key(m))
            .collect();
        let aw: f64 = available.iter().map(|m| m.weight()).sum();
        let adjusted: f64 = available.iter().map(|m| m.weight() / aw).sum();
        assert!((adjusted - 1.0).abs() < 1e-9);
    }

    #[test]
    fn two_metric_country_is_low_confidence() {
        let raw = RawMetrics {
            fx_vol: Some(0.05), // clamps to 1.0
            inflation: Some(3.0),
            ..Default::default()
        };
        let r = compute_score(&raw, &full_norms()).unwrap();
        // availableWeight 0.45; (0.25*1.0 + 0.20*0.6) / 0.45 = 0.37/0.45
        assert_eq!(r.score, crate::mathx::round1(100.0 * 0.37 / 0.45));
        assert_eq!(r.score, 82.2);
        assert_eq!(r.flags.get("low_confidence"), Some(&Value::Bool(true)));
        assert_eq!(r.flags.get("partial"), Some(&Value::Bool(true)));
    }

    #[test]
    fn single_metric_gets_full_weight() {
        let raw = RawMetrics {
            risk_spread: Some(4.5),
            ..Default::default()
        };
        let r = compute_score(&raw, &full_norms()).unwrap();
        assert_eq!(r.score, 75.0); // 4.5 / 6.0 * 100
    }

    #[test]
    fn degenerate_bounds_contribute_half() {
        let mut norms = NormMap::new();
        norms.insert(MetricName::FxVol, bounds(0.02, 0.02));
        let raw = RawMetrics {
            fx_vol: Some(0.02),
            ..Default::default()
        };
        let r = compute_score(&raw, &norms).unwrap();
        assert_eq!(r.score, 50.0);
        assert_eq!(r.flags.get("low_confidence"), Some(&Value::Bool(true)));
    }

    #[test]
    fn no_scoreable_metric_yields_none() {
        let r = compute_score(&RawMetrics::default(), &full_norms());
        assert!(r.is_none());

        // Data present but no norm bounds at all: still unscoreable.
        let raw = RawMetrics {
            fx_vol: Some(0.03),
            ..Default::default()
        };
        let r = compute_score(&raw, &NormMap::new());
        assert!(r.is_none());
    }

    #[test]
    fn norm_missing_is_flagged_per_metric() {
        let mut norms = full_norms();
        norms.remove(&MetricName::Inflation);
        let raw = RawMetrics {
            fx_vol: Some(0.03),
            inflation: Some(2.0),
            ..Default::default()
        };
        let r = compute_score(&raw, &norms).unwrap();
        assert_eq!(
            r.flags.get("inflation_norm_missing"),
            Some(&Value::Bool(true))
        );
        let missing: Vec<&str> = r.flags["missing"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(missing.contains(&"inflation"));
    }

    #[test]
    fn identical_inputs_identical_outputs() {
        let raw = RawMetrics {
            fx_vol: Some(0.0213),
            inflation: Some(4.2),
            risk_spread: Some(2.9),
            crypto_ratio: Some(0.31),
            reserves_change: Some(-3.3),
            stablecoin_premium: Some(12.0),
        };
        let norms = full_norms();
        let a = compute_score(&raw, &norms).unwrap();
        let b = compute_score(&raw, &norms).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a.flags).unwrap(),
            serde_json::to_string(&b.flags).unwrap()
        );
    }

    #[test]
    fn component_scores_round_and_mark_absent() {
        let raw = RawMetrics {
            fx_vol: Some(0.030),
            inflation: Some(1.5),
            ..Default::default()
        };
        let comps = component_scores(&raw, &full_norms());
        assert_eq!(comps["fx_vol"], Some(66.7));
        assert_eq!(comps["inflation"], Some(30.0));
        assert_eq!(comps["risk_spread"], None);
        assert_eq!(comps["stablecoin_premium"], None);
    }
}
