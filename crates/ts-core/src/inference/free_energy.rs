//! Variational free energy of the factorized posterior.

use ts_common::{Observation, NUM_CONTEXTS, NUM_POSITIONS};
use ts_math::{kl_divergence, safe_ln};

use super::belief::BeliefState;
use crate::model::GenerativeModel;

/// `F = KL(q_c || p_c) + KL(q_p || p_p) - E_q[ln A(o | c, p)]`.
///
/// Prior and likelihood logs are floored with `ln(x + 1e-16)`, so one-hot
/// priors and deterministic likelihood entries stay finite.
pub fn free_energy(
    model: &GenerativeModel,
    observation: Observation,
    belief: &BeliefState,
    prior_context: &[f64; NUM_CONTEXTS],
    prior_position: &[f64; NUM_POSITIONS],
) -> f64 {
    let complexity = kl_divergence(&belief.context, prior_context)
        + kl_divergence(&belief.position, prior_position);

    let row = &model.a[observation.index()];
    let mut accuracy = 0.0;
    for (c, lik) in row.iter().enumerate() {
        for (p, &a) in lik.iter().enumerate() {
            accuracy += belief.joint(c, p) * safe_ln(a);
        }
    }

    complexity - accuracy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_matching_belief_has_only_accuracy_term() {
        let model = GenerativeModel::default();
        let belief = BeliefState::initial(&model);
        let f = free_energy(
            &model,
            Observation::NotTouched,
            &belief,
            &model.d_context,
            &model.d_position,
        );
        // context 0 gives 0.5 everywhere
        assert!((f - std::f64::consts::LN_2).abs() < 1e-9);
    }

    #[test]
    fn complexity_is_the_kl_from_each_prior() {
        let model = GenerativeModel::default();
        let mut belief = BeliefState::uniform();
        belief.context = [1.0, 0.0, 0.0, 0.0];
        belief.position = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let f = free_energy(
            &model,
            Observation::NotTouched,
            &belief,
            &[0.25; NUM_CONTEXTS],
            &[0.125; NUM_POSITIONS],
        );
        // ln 4 + ln 8 of complexity, ln 2 of inaccuracy
        assert!((f - 64f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn uniform_belief_against_one_hot_prior_is_expensive() {
        let model = GenerativeModel::default();
        let f = free_energy(
            &model,
            Observation::NotTouched,
            &BeliefState::uniform(),
            &model.d_context,
            &model.d_position,
        );
        assert!(f > 30.0);
        assert!(f.is_finite());
    }
}
