//! Policy evaluation and action selection.

pub mod policy;
pub mod select;

pub use policy::{evaluate_policies, expected_info_gain, PolicyPosterior, DEFAULT_GAMMA};
pub use select::{sample_action, select_with_draw};
