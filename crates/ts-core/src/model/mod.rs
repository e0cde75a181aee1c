//! Generative model for tactile search.
//!
//! Two hidden factors: a persistent context (which mirrored zone produces
//! contact, or none identified) and the arm position. One binary touch
//! observation depends on both.
//!
//! Layouts (all column-stochastic over the leading index):
//! - `a[o][c][p]`: P(observation | context, position)
//! - `b_context[to][from]`
//! - `b_position[action][to][from]`

pub mod precision;

pub use precision::{reweight, Precision, PRECISION_FLOOR};

use thiserror::Error;
use ts_common::{Action, Position, NUM_ACTIONS, NUM_CONTEXTS, NUM_OBSERVATIONS, NUM_POSITIONS};
use ts_math::is_distribution;

/// Tolerance for column-sum checks on model tables.
pub const COLUMN_TOL: f64 = 1e-9;

pub type Likelihood = [[[f64; NUM_POSITIONS]; NUM_CONTEXTS]; NUM_OBSERVATIONS];
pub type ContextTransition = [[f64; NUM_CONTEXTS]; NUM_CONTEXTS];
pub type PositionTransition = [[[f64; NUM_POSITIONS]; NUM_POSITIONS]; NUM_ACTIONS];

/// Errors from model construction and reweighting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("{what} has {actual} entries, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("start position {0} out of range 0..8")]
    PositionOutOfRange(usize),

    #[error("{table} column {column} sums to {sum}, not 1")]
    NotStochastic {
        table: &'static str,
        column: usize,
        sum: f64,
    },

    #[error("precision {name} must be finite and > 0, got {value}")]
    InvalidPrecision { name: &'static str, value: f64 },
}

impl From<ModelError> for ts_common::Error {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::DimensionMismatch { .. } | ModelError::NotStochastic { .. } => {
                ts_common::Error::DimensionMismatch(err.to_string())
            }
            _ => ts_common::Error::Configuration(err.to_string()),
        }
    }
}

/// Likelihood, transitions, initial prior and habit prior.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerativeModel {
    pub a: Likelihood,
    pub b_context: ContextTransition,
    pub b_position: PositionTransition,
    pub d_context: [f64; NUM_CONTEXTS],
    pub d_position: [f64; NUM_POSITIONS],
    pub e: [f64; NUM_ACTIONS],
}

/// Default habit: favour the large-amplitude action.
pub const DEFAULT_HABIT: [f64; NUM_ACTIONS] = [0.75, 0.25];

/// Default start position (index 7).
pub const DEFAULT_START: usize = 7;

impl GenerativeModel {
    /// Construct the static model with the given start position and habit.
    pub fn build(start_position: usize, habit: &[f64]) -> Result<Self, ModelError> {
        let start = Position::new(start_position)
            .ok_or(ModelError::PositionOutOfRange(start_position))?;
        if habit.len() != NUM_ACTIONS {
            return Err(ModelError::DimensionMismatch {
                what: "habit prior",
                expected: NUM_ACTIONS,
                actual: habit.len(),
            });
        }
        let mut e = [0.0; NUM_ACTIONS];
        e.copy_from_slice(habit);

        let model = GenerativeModel {
            a: likelihood(),
            b_context: context_identity(),
            b_position: position_transitions(),
            d_context: one_hot(0),
            d_position: one_hot(start.index()),
            e,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check that every table column is a probability distribution.
    pub fn validate(&self) -> Result<(), ModelError> {
        for c in 0..NUM_CONTEXTS {
            for p in 0..NUM_POSITIONS {
                let col: Vec<f64> = (0..NUM_OBSERVATIONS).map(|o| self.a[o][c][p]).collect();
                check_column("A", c * NUM_POSITIONS + p, &col)?;
            }
        }
        for from in 0..NUM_CONTEXTS {
            let col: Vec<f64> = (0..NUM_CONTEXTS).map(|to| self.b_context[to][from]).collect();
            check_column("B_context", from, &col)?;
        }
        for (a, table) in self.b_position.iter().enumerate() {
            for from in 0..NUM_POSITIONS {
                let col: Vec<f64> = (0..NUM_POSITIONS).map(|to| table[to][from]).collect();
                check_column("B_position", a * NUM_POSITIONS + from, &col)?;
            }
        }
        check_column("D_context", 0, &self.d_context)?;
        check_column("D_position", 0, &self.d_position)?;
        check_column("E", 0, &self.e)?;
        Ok(())
    }

    /// Position transition table for one action.
    pub fn transitions(&self, action: Action) -> &[[f64; NUM_POSITIONS]; NUM_POSITIONS] {
        &self.b_position[action.index()]
    }

    /// Deterministic successor of `from` under `action`, if the column is one-hot.
    pub fn successor(&self, from: Position, action: Action) -> Option<Position> {
        let table = self.transitions(action);
        let hits: Vec<usize> = (0..NUM_POSITIONS)
            .filter(|&to| table[to][from.index()] == 1.0)
            .collect();
        match hits.as_slice() {
            [to] => Position::new(*to),
            _ => None,
        }
    }
}

impl Default for GenerativeModel {
    fn default() -> Self {
        GenerativeModel {
            a: likelihood(),
            b_context: context_identity(),
            b_position: position_transitions(),
            d_context: one_hot(0),
            d_position: one_hot(DEFAULT_START),
            e: DEFAULT_HABIT,
        }
    }
}

fn check_column(table: &'static str, column: usize, values: &[f64]) -> Result<(), ModelError> {
    if is_distribution(values, COLUMN_TOL) {
        return Ok(());
    }
    Err(ModelError::NotStochastic {
        table,
        column,
        sum: values.iter().sum(),
    })
}

fn one_hot<const N: usize>(idx: usize) -> [f64; N] {
    let mut v = [0.0; N];
    v[idx] = 1.0;
    v
}

/// Context 0 is uninformative everywhere; context `c` in 1..=3 produces
/// contact for certain at positions `c` and `8 - c`.
fn likelihood() -> Likelihood {
    let mut a = [[[0.5; NUM_POSITIONS]; NUM_CONTEXTS]; NUM_OBSERVATIONS];
    for c in 1..NUM_CONTEXTS {
        for p in [c, NUM_POSITIONS - c] {
            a[0][c][p] = 1.0;
            a[1][c][p] = 0.0;
        }
    }
    a
}

fn context_identity() -> ContextTransition {
    let mut b = [[0.0; NUM_CONTEXTS]; NUM_CONTEXTS];
    for (c, row) in b.iter_mut().enumerate() {
        row[c] = 1.0;
    }
    b
}

/// Action 0 shifts forward cyclically (7 wraps to 0). Action 1 hops 0→1 and
/// 1→2, then reflects positions 2..=7 onto 7..=2.
fn position_transitions() -> PositionTransition {
    let mut b = [[[0.0; NUM_POSITIONS]; NUM_POSITIONS]; NUM_ACTIONS];
    for from in 0..NUM_POSITIONS {
        b[Action::LargeAmplitude.index()][(from + 1) % NUM_POSITIONS][from] = 1.0;

        let to = match from {
            0 | 1 => from + 1,
            _ => 7 - (from - 2),
        };
        b[Action::SmallAmplitude.index()][to][from] = 1.0;
    }
    b
}
