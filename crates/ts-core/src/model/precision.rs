//! Precision-weighted smoothing of model tables.
//!
//! Each reweighted column becomes `softmax(kappa * ln(column + exp(-8)))`.

use super::{GenerativeModel, ModelError};
use serde::{Deserialize, Serialize};
use ts_common::{NUM_CONTEXTS, NUM_OBSERVATIONS, NUM_POSITIONS};
use ts_math::precision_softmax;

/// Floor added inside the log during reweighting.
pub const PRECISION_FLOOR: f64 = 3.354_626_279_025_119e-4; // exp(-8)

/// Precision constants applied to the model tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Precision {
    /// Sharpens the context-conditioned likelihood columns (contexts 1..=3).
    pub zeta: f64,
    /// Sharpens the context self-transition.
    pub omega: f64,
    /// Sharpens the habit prior.
    pub rho: f64,
}

impl Default for Precision {
    fn default() -> Self {
        Precision {
            zeta: 0.5,
            omega: 0.8,
            rho: 0.5,
        }
    }
}

impl Precision {
    fn check(&self) -> Result<(), ModelError> {
        for (name, value) in [("zeta", self.zeta), ("omega", self.omega), ("rho", self.rho)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::InvalidPrecision { name, value });
            }
        }
        Ok(())
    }
}

/// Return a copy of `model` with `A[:, 1..=3, :]`, `B_context` and `E`
/// replaced by their precision-smoothed versions.
///
/// Context 0 of the likelihood, the position transitions and `D` are left
/// untouched.
pub fn reweight(
    model: &GenerativeModel,
    precision: &Precision,
) -> Result<GenerativeModel, ModelError> {
    precision.check()?;
    let mut out = model.clone();

    for c in 1..NUM_CONTEXTS {
        for p in 0..NUM_POSITIONS {
            let column: Vec<f64> = (0..NUM_OBSERVATIONS).map(|o| model.a[o][c][p]).collect();
            let smoothed = precision_softmax(&column, precision.zeta, PRECISION_FLOOR);
            for (o, v) in smoothed.into_iter().enumerate() {
                out.a[o][c][p] = v;
            }
        }
    }

    for from in 0..NUM_CONTEXTS {
        let column: Vec<f64> = (0..NUM_CONTEXTS).map(|to| model.b_context[to][from]).collect();
        let smoothed = precision_softmax(&column, precision.omega, PRECISION_FLOOR);
        for (to, v) in smoothed.into_iter().enumerate() {
            out.b_context[to][from] = v;
        }
    }

    let habit = precision_softmax(&model.e, precision.rho, PRECISION_FLOOR);
    out.e.copy_from_slice(&habit);

    out.validate()?;
    Ok(out)
}
