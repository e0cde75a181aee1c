//! Tactile Search math utilities.

pub mod math;

pub use math::categorical::*;
pub use math::stable::*;
