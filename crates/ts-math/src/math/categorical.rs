//! Helpers for finite categorical distributions stored as plain slices.

use super::stable::safe_ln;

/// Default tolerance for "sums to one" checks.
pub const DIST_TOL: f64 = 1e-9;

/// Normalize `values` in place so they sum to one.
///
/// Returns the original sum, or `None` (leaving the slice untouched) when the
/// sum is zero, negative, or not finite.
pub fn normalize(values: &mut [f64]) -> Option<f64> {
    let sum: f64 = values.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    values.iter_mut().for_each(|v| *v /= sum);
    Some(sum)
}

/// True if every entry is finite and non-negative and the entries sum to one within `tol`.
pub fn is_distribution(values: &[f64], tol: f64) -> bool {
    if values.is_empty() {
        return false;
    }
    if values.iter().any(|&v| !v.is_finite() || v < -tol) {
        return false;
    }
    let sum: f64 = values.iter().sum();
    (sum - 1.0).abs() <= tol
}

/// Shannon entropy in nats. Zero-probability entries contribute nothing.
pub fn entropy(p: &[f64]) -> f64 {
    -p.iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| v * v.ln())
        .sum::<f64>()
}

/// KL(p || q) in nats, with q floored so that mismatched supports stay finite.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q.iter())
        .filter(|(&pi, _)| pi > 0.0)
        .map(|(&pi, &qi)| pi * (pi.ln() - safe_ln(qi)))
        .sum()
}

/// Index of the largest entry (first one on ties). `None` for empty input or NaN entries.
pub fn argmax(values: &[f64]) -> Option<usize> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    Some(best)
}

/// Ratio of the largest entry to the second largest.
///
/// Infinite when the runner-up is zero; `None` for fewer than two entries.
pub fn max_ratio(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    if sorted[1] <= 0.0 {
        return Some(f64::INFINITY);
    }
    Some(sorted[0] / sorted[1])
}
