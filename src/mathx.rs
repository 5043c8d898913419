//! mathx.rs — numeric primitives shared by the scoring engine and the
//! backfill reducers. All functions are pure and deterministic.

/// Fraction of a rolling window that must hold non-null returns before the
/// window produces a value.
const MIN_WINDOW_COVERAGE: f64 = 0.8;

/// Linear map of `v` into [0, 1] against the `[lo, hi]` clamp bounds.
///
/// Values outside the bounds saturate. A degenerate history (`hi == lo`)
/// yields 0.5 so the metric contributes a neutral component instead of
/// dividing by zero.
pub fn clamp_normalize(v: f64, lo: f64, hi: f64) -> f64 {
    if hi == lo {
        return 0.5;
    }
    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Rolling sample standard deviation of log-returns over `window` periods.
///
/// Input is an ordered series of optional positive closes. Output has the
/// same length; position `i` is `None` until `window` prior observations
/// exist, or when fewer than 80% of the trailing `window` log-returns are
/// computable (gaps, non-positive closes).
pub fn rolling_std_log_returns(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let returns = log_returns(closes);
    rolling_sample_std(&returns, window)
}

/// Rolling mean with the same 80%-coverage gating as the rolling std-dev.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in 0..values.len() {
        if i + 1 < window {
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let valid: Vec<f64> = slice.iter().filter_map(|v| *v).collect();
        if (valid.len() as f64) < MIN_WINDOW_COVERAGE * window as f64 {
            continue;
        }
        out[i] = Some(valid.iter().sum::<f64>() / valid.len() as f64);
    }
    out
}

/// Percent change of `v` against a reference value: `((v - ref) / |ref|) * 100`.
///
/// `None` when the reference is missing or zero.
pub fn pct_change(v: f64, reference: Option<f64>) -> Option<f64> {
    let r = reference?;
    if r == 0.0 {
        return None;
    }
    Some((v - r) / r.abs() * 100.0)
}

/// Linear-interpolation percentile (p in [0, 100]) of a non-empty sample.
///
/// Uses the fractional rank `p/100 * (n - 1)` over the sorted sample, the
/// same convention as numpy's default.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of a non-empty sample.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Round to one decimal digit.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Log-return at position k is `ln(close[k] / close[k-1])`; `None` when
/// either close is missing or non-positive. Position 0 is always `None`.
fn log_returns(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    for k in 1..closes.len() {
        if let (Some(prev), Some(cur)) = (closes[k - 1], closes[k]) {
            if prev > 0.0 && cur > 0.0 {
                out[k] = Some((cur / prev).ln());
            }
        }
    }
    out
}

/// Sample std-dev (divisor n-1) over trailing windows of `window` values,
/// gated on 80% coverage.
fn rolling_sample_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window < 2 {
        return out;
    }
    for i in 0..values.len() {
        // The trailing window of `window` returns needs positions
        // i-window+1..=i, and position 0 never carries a return.
        if i < window {
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let valid: Vec<f64> = slice.iter().filter_map(|v| *v).collect();
        if (valid.len() as f64) < MIN_WINDOW_COVERAGE * window as f64 || valid.len() < 2 {
            continue;
        }
        let n = valid.len() as f64;
        let mean = valid.iter().sum::<f64>() / n;
        let var = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        out[i] = Some(var.sqrt());
    }
    out
}
