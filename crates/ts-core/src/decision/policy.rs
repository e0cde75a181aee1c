//! Expected-free-energy scoring of the one-step policies.
//!
//! ```text
//! q'(s)   = B_a q(s)                                   predictive belief
//! IG(a)   = H[ sum_s A(o|s) q'(s) ] - sum_s q'(s) H[A(.|s)]
//! G(a)    = -IG(a)                                     (no preferences)
//! q_pi    = softmax(gamma * IG + ln E)
//! ```
//!
//! `s` ranges over the joint (context, position) state under the
//! factorized predictive belief.

use serde::{Deserialize, Serialize};
use ts_common::{Action, NUM_ACTIONS, NUM_OBSERVATIONS};
use ts_math::{argmax, entropy, safe_ln, softmax_in_place};

use crate::inference::BeliefState;
use crate::model::GenerativeModel;

/// Default policy precision.
pub const DEFAULT_GAMMA: f64 = 16.0;

/// Posterior over the candidate actions, with the epistemic terms that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyPosterior {
    pub probs: [f64; NUM_ACTIONS],
    /// Expected information gain per action (nats).
    pub info_gain: [f64; NUM_ACTIONS],
    /// Expected free energy per action (`-info_gain`).
    pub expected_free_energy: [f64; NUM_ACTIONS],
}

impl PolicyPosterior {
    pub fn probability(&self, action: Action) -> f64 {
        self.probs[action.index()]
    }

    /// Action with the highest posterior mass.
    pub fn most_likely(&self) -> Option<Action> {
        argmax(&self.probs).and_then(Action::from_index)
    }
}

/// Mutual information between the next observation and the predicted hidden
/// state after taking `action`.
pub fn expected_info_gain(model: &GenerativeModel, belief: &BeliefState, action: Action) -> f64 {
    let predicted = belief.propagate(model, action);

    let mut marginal = [0.0; NUM_OBSERVATIONS];
    let mut conditional_entropy = 0.0;
    for (c, &qc) in predicted.context.iter().enumerate() {
        for (p, &qp) in predicted.position.iter().enumerate() {
            let q = qc * qp;
            if q == 0.0 {
                continue;
            }
            let column = [model.a[0][c][p], model.a[1][c][p]];
            for (o, m) in marginal.iter_mut().enumerate() {
                *m += q * column[o];
            }
            conditional_entropy += q * entropy(&column);
        }
    }

    // Clamp rounding noise; mutual information is never negative.
    (entropy(&marginal) - conditional_entropy).max(0.0)
}

/// Score both actions and combine with the habit prior `E` at precision `gamma`.
pub fn evaluate_policies(
    model: &GenerativeModel,
    belief: &BeliefState,
    gamma: f64,
) -> PolicyPosterior {
    let mut info_gain = [0.0; NUM_ACTIONS];
    for action in Action::ALL {
        info_gain[action.index()] = expected_info_gain(model, belief, action);
    }

    let mut probs = [0.0; NUM_ACTIONS];
    for (i, p) in probs.iter_mut().enumerate() {
        *p = gamma * info_gain[i] + safe_ln(model.e[i]);
    }
    softmax_in_place(&mut probs);

    PolicyPosterior {
        probs,
        info_gain,
        expected_free_energy: info_gain.map(|ig| -ig),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{reweight, Precision};
    use ts_common::{NUM_CONTEXTS, NUM_POSITIONS};

    fn model() -> GenerativeModel {
        reweight(&GenerativeModel::default(), &Precision::default()).unwrap()
    }

    #[test]
    fn known_context_zero_has_no_information() {
        let m = model();
        let belief = BeliefState::initial(&m);
        let q = evaluate_policies(&m, &belief, DEFAULT_GAMMA);
        // context 0 is mostly kept by the smoothed identity, so the gain is tiny
        assert!(q.info_gain.iter().all(|&ig| ig < 0.05));
        assert!((q.probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zone_uncertainty_favours_informative_action() {
        let m = model();
        let belief = BeliefState {
            context: [0.25; NUM_CONTEXTS],
            position: {
                let mut p = [0.0; NUM_POSITIONS];
                p[0] = 1.0;
                p
            },
        };
        // from 0 both actions reach position 1 (zone 1)
        let q = evaluate_policies(&m, &belief, DEFAULT_GAMMA);
        assert!((q.info_gain[0] - q.info_gain[1]).abs() < 1e-12);

        let mut at_three = belief;
        at_three.position = [0.0; NUM_POSITIONS];
        at_three.position[3] = 1.0;
        // large: 3 -> 4 (uninformative for every zone). small: 3 -> 6 (zone 2).
        let q = evaluate_policies(&m, &at_three, DEFAULT_GAMMA);
        assert!(q.info_gain[1] > q.info_gain[0]);
        assert!(q.info_gain[0].abs() < 1e-12);
        assert_eq!(q.most_likely(), Some(Action::SmallAmplitude));
    }

    #[test]
    fn zero_gamma_returns_habit() {
        let m = model();
        let q = evaluate_policies(&m, &BeliefState::uniform(), 0.0);
        for i in 0..NUM_ACTIONS {
            assert!((q.probs[i] - m.e[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn free_energy_is_negated_gain() {
        let m = model();
        let q = evaluate_policies(&m, &BeliefState::uniform(), DEFAULT_GAMMA);
        for i in 0..NUM_ACTIONS {
            assert_eq!(q.expected_free_energy[i], -q.info_gain[i]);
            assert!(q.info_gain[i] >= 0.0);
        }
    }
}
