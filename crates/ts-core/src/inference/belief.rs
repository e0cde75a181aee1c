//! Factorized belief state over context and position.

use serde::{Deserialize, Serialize};
use ts_common::{Action, Position, NUM_CONTEXTS, NUM_POSITIONS};
use ts_math::{argmax, is_distribution};

use crate::model::GenerativeModel;

/// Mean-field posterior: independent categoricals over context and position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    pub context: [f64; NUM_CONTEXTS],
    pub position: [f64; NUM_POSITIONS],
}

impl BeliefState {
    /// Uniform over both factors (the coordinate-ascent starting point).
    pub fn uniform() -> Self {
        BeliefState {
            context: [1.0 / NUM_CONTEXTS as f64; NUM_CONTEXTS],
            position: [1.0 / NUM_POSITIONS as f64; NUM_POSITIONS],
        }
    }

    /// The model's initial prior `D`.
    pub fn initial(model: &GenerativeModel) -> Self {
        BeliefState {
            context: model.d_context,
            position: model.d_position,
        }
    }

    /// Both factors sum to one within `tol`.
    pub fn is_normalized(&self, tol: f64) -> bool {
        is_distribution(&self.context, tol) && is_distribution(&self.position, tol)
    }

    /// Joint probability under the factorization.
    #[inline]
    pub fn joint(&self, context: usize, position: usize) -> f64 {
        self.context[context] * self.position[position]
    }

    /// Predictive belief one step ahead: context through `B_context`, position
    /// through the transition table of `action`.
    pub fn propagate(&self, model: &GenerativeModel, action: Action) -> BeliefState {
        let mut context = [0.0; NUM_CONTEXTS];
        for (to, out) in context.iter_mut().enumerate() {
            *out = (0..NUM_CONTEXTS)
                .map(|from| model.b_context[to][from] * self.context[from])
                .sum();
        }

        let table = model.transitions(action);
        let mut position = [0.0; NUM_POSITIONS];
        for (to, out) in position.iter_mut().enumerate() {
            *out = (0..NUM_POSITIONS)
                .map(|from| table[to][from] * self.position[from])
                .sum();
        }

        BeliefState { context, position }
    }

    /// Most probable context value.
    pub fn map_context(&self) -> Option<usize> {
        argmax(&self.context)
    }

    /// Most probable position.
    pub fn map_position(&self) -> Option<Position> {
        argmax(&self.position).and_then(Position::new)
    }
}
