//! Belief updating.

pub mod belief;
pub mod free_energy;
pub mod update;

pub use belief::BeliefState;
pub use free_energy::free_energy;
pub use update::{infer_states, InferenceError, InferenceOutcome, InferenceSettings};
