//! Numerically stable primitives for log-domain categorical math.

/// Floor added before taking a log of a probability (mirrors `ln(x + 1e-16)`).
pub const LN_FLOOR: f64 = 1e-16;

/// Stable log(sum(exp(values))).
///
/// Returns NEG_INFINITY for empty input or all -inf inputs.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Natural log with an additive floor, so `ln_floor(0.0, f)` is `ln(f)` and never -inf.
#[inline]
pub fn ln_floor(x: f64, floor: f64) -> f64 {
    (x + floor).ln()
}

/// Natural log with the default [`LN_FLOOR`].
#[inline]
pub fn safe_ln(x: f64) -> f64 {
    ln_floor(x, LN_FLOOR)
}

/// Normalized exponentials of `logits`, computed via log-sum-exp.
///
/// Entries equal to -inf map to exactly 0. If every entry is -inf (or the
/// input is empty) the result is uniform, so callers always get a distribution.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let mut out = logits.to_vec();
    softmax_in_place(&mut out);
    out
}

/// In-place variant of [`softmax`].
pub fn softmax_in_place(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let lse = log_sum_exp(values);
    if !lse.is_finite() {
        let p = 1.0 / values.len() as f64;
        values.iter_mut().for_each(|v| *v = p);
        return;
    }
    for v in values.iter_mut() {
        *v = (*v - lse).exp();
    }
}

/// Precision-weighted smoothing of a single distribution: `softmax(kappa * ln(p + floor))`.
///
/// `kappa > 1` sharpens, `kappa < 1` flattens, `kappa == 1` returns `p` up to the floor.
pub fn precision_softmax(distribution: &[f64], kappa: f64, floor: f64) -> Vec<f64> {
    let logits: Vec<f64> = distribution
        .iter()
        .map(|&p| kappa * ln_floor(p, floor))
        .collect();
    softmax(&logits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn log_sum_exp_basic() {
        let out = log_sum_exp(&[0.0, 0.0]);
        assert!(approx_eq(out, 2.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_sum_exp_dominance() {
        let out = log_sum_exp(&[-1000.0, 0.0]);
        assert!(approx_eq(out, 0.0, 1e-12));
    }

    #[test]
    fn log_sum_exp_all_neg_inf() {
        let out = log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert!(out.is_infinite() && out.is_sign_negative());
    }

    #[test]
    fn log_sum_exp_nan_propagates() {
        assert!(log_sum_exp(&[0.0, f64::NAN]).is_nan());
    }

    #[test]
    fn softmax_large_logits_stay_finite() {
        let p = softmax(&[1000.0, 999.0]);
        assert!(p.iter().all(|v| v.is_finite()));
        assert!(approx_eq(p[0] + p[1], 1.0, 1e-12));
        assert!(p[0] > p[1]);
    }

    #[test]
    fn softmax_neg_inf_entry_is_zero() {
        let p = softmax(&[0.0, f64::NEG_INFINITY]);
        assert!(approx_eq(p[0], 1.0, 1e-15));
        assert_eq!(p[1], 0.0);
    }

    #[test]
    fn softmax_all_neg_inf_is_uniform() {
        let p = softmax(&[f64::NEG_INFINITY; 4]);
        assert!(p.iter().all(|&v| approx_eq(v, 0.25, 1e-15)));
    }

    #[test]
    fn safe_ln_of_zero_is_finite() {
        let v = safe_ln(0.0);
        assert!(v.is_finite());
        assert!(approx_eq(v, LN_FLOOR.ln(), 1e-12));
    }

    #[test]
    fn precision_softmax_unit_kappa_recovers_input() {
        let p = [0.75, 0.25];
        let out = precision_softmax(&p, 1.0, (-8.0f64).exp());
        assert!(approx_eq(out[0], 0.75, 1e-3));
        assert!(approx_eq(out[1], 0.25, 1e-3));
    }

    #[test]
    fn precision_softmax_flattens_below_one() {
        let out = precision_softmax(&[1.0, 0.0], 0.5, (-8.0f64).exp());
        // 0.5 * ln(1 + e^-8) vs 0.5 * -8
        assert!(out[0] < 1.0 && out[0] > 0.97);
        assert!(out[1] > 0.0);
    }
}
