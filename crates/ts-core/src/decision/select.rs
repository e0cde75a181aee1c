//! Stochastic action selection.
//!
//! Every call is an independent draw from `q_pi`; there is no argmax
//! shortcut. The random source is always passed in.

use rand::Rng;
use ts_common::{Action, NUM_ACTIONS};

/// Draw one action from `q`.
pub fn sample_action<R: Rng>(q: &[f64; NUM_ACTIONS], rng: &mut R) -> Action {
    let u: f64 = rng.random();
    select_with_draw(q, u)
}

/// Inverse-CDF selection for a uniform draw `u` in `[0, 1)`.
///
/// Rounding can leave the cumulative sum just under one; in that case the
/// last action carrying positive mass is returned, so a zero-probability
/// action is never chosen.
pub fn select_with_draw(q: &[f64; NUM_ACTIONS], u: f64) -> Action {
    let mut cumulative = 0.0;
    for action in Action::ALL {
        cumulative += q[action.index()];
        if u < cumulative {
            return action;
        }
    }
    Action::ALL
        .iter()
        .rev()
        .copied()
        .find(|a| q[a.index()] > 0.0)
        .unwrap_or(Action::LargeAmplitude)
}
