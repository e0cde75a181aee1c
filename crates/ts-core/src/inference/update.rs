//! Mean-field coordinate ascent over the two hidden factors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_common::{Observation, NUM_CONTEXTS, NUM_POSITIONS};
use ts_math::{is_distribution, safe_ln, softmax_in_place};

use super::belief::BeliefState;
use super::free_energy::free_energy;
use crate::model::GenerativeModel;

/// Tolerance for accepting a prior as a distribution.
const PRIOR_TOL: f64 = 1e-6;

/// Iteration controls for [`infer_states`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    /// Cap on full sweeps (context update then position update).
    pub max_iterations: usize,
    /// Stop once `|F_k - F_{k-1}|` drops below this.
    pub tolerance: f64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        InferenceSettings {
            max_iterations: 16,
            tolerance: 1e-3,
        }
    }
}

/// Result of one belief update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutcome {
    pub belief: BeliefState,
    /// Free energy after the last sweep.
    pub free_energy: f64,
    /// Sweeps performed.
    pub iterations: usize,
    /// False if the cap was hit before `|dF| < tolerance`. The belief is
    /// still usable.
    pub converged: bool,
}

impl InferenceOutcome {
    /// Non-fatal warning when the sweep cap was hit before convergence.
    pub fn degraded(&self) -> Option<ts_common::Error> {
        (!self.converged).then(|| {
            ts_common::Error::Inference(format!(
                "no convergence after {} sweeps (F = {:.6})",
                self.iterations, self.free_energy
            ))
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("{factor} prior is not a probability distribution")]
    InvalidPrior { factor: &'static str },

    #[error("invalid inference settings: {0}")]
    InvalidSettings(String),
}

impl From<InferenceError> for ts_common::Error {
    fn from(err: InferenceError) -> Self {
        ts_common::Error::Configuration(err.to_string())
    }
}

/// Posterior over (context, position) given one observation and explicit priors.
///
/// Starts from uniform beliefs and alternates the two factor updates, each
/// using the freshest value of the other factor. Deterministic for fixed
/// inputs.
pub fn infer_states(
    model: &GenerativeModel,
    observation: Observation,
    prior_context: &[f64; NUM_CONTEXTS],
    prior_position: &[f64; NUM_POSITIONS],
    settings: &InferenceSettings,
) -> Result<InferenceOutcome, InferenceError> {
    if !is_distribution(prior_context, PRIOR_TOL) {
        return Err(InferenceError::InvalidPrior { factor: "context" });
    }
    if !is_distribution(prior_position, PRIOR_TOL) {
        return Err(InferenceError::InvalidPrior { factor: "position" });
    }
    if settings.max_iterations == 0 {
        return Err(InferenceError::InvalidSettings(
            "max_iterations must be > 0".to_string(),
        ));
    }
    if settings.tolerance.is_nan() || settings.tolerance <= 0.0 {
        return Err(InferenceError::InvalidSettings(
            "tolerance must be > 0".to_string(),
        ));
    }

    let mut log_lik = [[0.0; NUM_POSITIONS]; NUM_CONTEXTS];
    for (c, row) in log_lik.iter_mut().enumerate() {
        for (p, v) in row.iter_mut().enumerate() {
            *v = safe_ln(model.a[observation.index()][c][p]);
        }
    }
    let ln_prior_context = prior_context.map(safe_ln);
    let ln_prior_position = prior_position.map(safe_ln);

    let mut belief = BeliefState::uniform();
    let mut f_prev = free_energy(model, observation, &belief, prior_context, prior_position);
    let mut f = f_prev;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        iterations += 1;

        let mut context = ln_prior_context;
        for (c, v) in context.iter_mut().enumerate() {
            *v += (0..NUM_POSITIONS)
                .map(|p| belief.position[p] * log_lik[c][p])
                .sum::<f64>();
        }
        softmax_in_place(&mut context);
        belief.context = context;

        let mut position = ln_prior_position;
        for (p, v) in position.iter_mut().enumerate() {
            *v += (0..NUM_CONTEXTS)
                .map(|c| belief.context[c] * log_lik[c][p])
                .sum::<f64>();
        }
        softmax_in_place(&mut position);
        belief.position = position;

        f = free_energy(model, observation, &belief, prior_context, prior_position);
        if (f - f_prev).abs() < settings.tolerance {
            converged = true;
            break;
        }
        f_prev = f;
    }

    Ok(InferenceOutcome {
        belief,
        free_energy: f,
        iterations,
        converged,
    })
}
