//! Ground-truth arm position used for bookkeeping.
//!
//! The state is a one-hot vector of length 8 advanced by the chosen action's
//! position transition matrix. Both matrices are permutation-like, so the
//! state stays one-hot; a step that breaks this is reported as an error.

use thiserror::Error;
use ts_common::{Action, Position, NUM_POSITIONS};

use crate::model::{GenerativeModel, PositionTransition};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvironmentError {
    #[error("environment state is not one-hot after {action}: {state:?}")]
    NotOneHot {
        action: Action,
        state: [f64; NUM_POSITIONS],
    },
}

impl From<EnvironmentError> for ts_common::Error {
    fn from(err: EnvironmentError) -> Self {
        ts_common::Error::DimensionMismatch(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentModel {
    state: [f64; NUM_POSITIONS],
    transitions: PositionTransition,
}

impl EnvironmentModel {
    pub fn new(model: &GenerativeModel, start: Position) -> Self {
        let mut state = [0.0; NUM_POSITIONS];
        state[start.index()] = 1.0;
        EnvironmentModel {
            state,
            transitions: model.b_position,
        }
    }

    pub fn state(&self) -> &[f64; NUM_POSITIONS] {
        &self.state
    }

    /// Current position (the hot index).
    pub fn position(&self) -> Option<Position> {
        one_hot_index(&self.state).and_then(Position::new)
    }

    /// `state <- B_position[action] @ state`; returns the new state and its index.
    pub fn step(
        &mut self,
        action: Action,
    ) -> Result<([f64; NUM_POSITIONS], Position), EnvironmentError> {
        let table = &self.transitions[action.index()];
        let mut next = [0.0; NUM_POSITIONS];
        for (to, out) in next.iter_mut().enumerate() {
            *out = (0..NUM_POSITIONS).map(|from| table[to][from] * self.state[from]).sum();
        }

        let position = one_hot_index(&next)
            .and_then(Position::new)
            .ok_or(EnvironmentError::NotOneHot { action, state: next })?;
        self.state = next;
        Ok((next, position))
    }
}

fn one_hot_index(v: &[f64; NUM_POSITIONS]) -> Option<usize> {
    let mut hot = None;
    for (i, &x) in v.iter().enumerate() {
        if x == 1.0 && hot.is_none() {
            hot = Some(i);
        } else if x != 0.0 {
            return None;
        }
    }
    hot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_at(i: usize) -> EnvironmentModel {
        EnvironmentModel::new(&GenerativeModel::default(), Position::new(i).unwrap())
    }

    #[test]
    fn large_amplitude_wraps_at_seven() {
        let mut env = env_at(7);
        let (state, pos) = env.step(Action::LargeAmplitude).unwrap();
        assert_eq!(pos.index(), 0);
        assert_eq!(state[0], 1.0);
        assert_eq!(state.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn small_amplitude_reflects_from_two() {
        let mut env = env_at(2);
        let (_, pos) = env.step(Action::SmallAmplitude).unwrap();
        assert_eq!(pos.index(), 7);
    }

    #[test]
    fn small_amplitude_hops_from_zero() {
        let mut env = env_at(0);
        let (_, pos) = env.step(Action::SmallAmplitude).unwrap();
        assert_eq!(pos.index(), 1);
        assert_eq!(env.position(), Some(pos));
    }

    #[test]
    fn state_stays_one_hot_over_long_runs() {
        let mut env = env_at(7);
        for i in 0..200 {
            let action = if i % 3 == 0 { Action::SmallAmplitude } else { Action::LargeAmplitude };
            env.step(action).unwrap();
            assert!(env.position().is_some());
        }
    }

    #[test]
    fn broken_transition_is_reported() {
        let mut model = GenerativeModel::default();
        model.b_position[0][1][7] = 0.5;
        model.b_position[0][0][7] = 0.5;
        let mut env = EnvironmentModel::new(&model, Position::new(7).unwrap());
        let err = env.step(Action::LargeAmplitude).unwrap_err();
        assert!(matches!(err, EnvironmentError::NotOneHot { .. }));
        // state is left untouched
        assert_eq!(env.position().map(Position::index), Some(7));
    }
}
