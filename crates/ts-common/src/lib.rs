//! Tactile Search common types and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Discrete domain primitives (observations, actions, arm positions)
//! - Model dimension constants
//! - The unified error type with stable codes
//! - Output format specifications

pub mod domain;
pub mod error;
pub mod output;

pub use domain::{
    Action, ArmZone, Observation, Position, NUM_ACTIONS, NUM_CONTEXTS, NUM_OBSERVATIONS,
    NUM_POSITIONS,
};
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use output::OutputFormat;
