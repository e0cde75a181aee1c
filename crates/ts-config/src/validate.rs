//! Configuration validation errors and semantic validation.

use crate::settings::{ChannelConfig, Config, DeviceKind, SenseMode};
use thiserror::Error;
use ts_common::{NUM_ACTIONS, NUM_POSITIONS};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 13,
            ValidationError::SemanticError(_) => 14,
        }
    }

    /// Dotted path of the offending field, if known.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidValue { field, .. } => Some(field),
            ValidationError::SemanticError(_) => None,
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

fn positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, format!("Must be finite and > 0, got {}", value)));
    }
    Ok(())
}

fn position(field: &str, value: usize) -> ValidationResult<()> {
    if value >= NUM_POSITIONS {
        return Err(invalid(
            field,
            format!("Must be a position index in 0..{}, got {}", NUM_POSITIONS, value),
        ));
    }
    Ok(())
}

/// Validate a complete configuration semantically.
pub fn validate_config(config: &Config) -> ValidationResult<()> {
    // Channel
    if config.channel.host.trim().is_empty() {
        return Err(invalid("channel.host", "Must not be empty"));
    }
    if config.channel.timeout_secs == 0 {
        return Err(invalid("channel.timeout_secs", "Must be > 0"));
    }

    // Robot
    if config.robot.cycles == 0 {
        return Err(invalid("robot.cycles", "Must be > 0"));
    }
    if config.robot.device == DeviceKind::Bridge {
        if config.robot.address.trim().is_empty() {
            return Err(invalid("robot.address", "Must not be empty for the bridge device"));
        }
        if config.robot.port == 0 {
            return Err(invalid("robot.port", "Must be non-zero for the bridge device"));
        }
    }
    if config.sense.mode == SenseMode::Sensor && config.robot.device != DeviceKind::Bridge {
        return Err(ValidationError::SemanticError(
            "sense.mode = \"sensor\" needs robot.device = \"bridge\"".to_string(),
        ));
    }

    // Model
    position("model.start_position", config.model.start_position)?;
    positive("model.zeta", config.model.zeta)?;
    positive("model.omega", config.model.omega)?;
    positive("model.rho", config.model.rho)?;
    positive("model.gamma", config.model.gamma)?;
    validate_habit(&config.model.habit)?;

    // Inference
    if config.inference.max_iterations == 0 {
        return Err(invalid("inference.max_iterations", "Must be > 0"));
    }
    positive("inference.tolerance", config.inference.tolerance)?;

    // Sense
    let p = config.sense.touch_probability;
    if !(0.0..=1.0).contains(&p) {
        return Err(invalid(
            "sense.touch_probability",
            format!("Must be in [0, 1], got {}", p),
        ));
    }
    position("sense.target_position", config.sense.target_position)?;
    if let Some(pair) = config
        .sense
        .touch_timesteps
        .windows(2)
        .find(|w| w[0] >= w[1])
    {
        return Err(invalid(
            "sense.touch_timesteps",
            format!("Must be strictly increasing ({} then {})", pair[0], pair[1]),
        ));
    }

    Ok(())
}

fn validate_habit(habit: &[f64]) -> ValidationResult<()> {
    if habit.len() != NUM_ACTIONS {
        return Err(invalid(
            "model.habit",
            format!("Must have {} entries, got {}", NUM_ACTIONS, habit.len()),
        ));
    }
    if habit.iter().any(|&h| !h.is_finite() || h <= 0.0) {
        return Err(invalid("model.habit", "Entries must be finite and > 0"));
    }
    let sum: f64 = habit.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
        return Err(invalid("model.habit", format!("Must sum to 1.0, got {}", sum)));
    }
    Ok(())
}

/// Extra checks for the side that dials the channel.
pub fn validate_connector(channel: &ChannelConfig) -> ValidationResult<()> {
    if channel.port == 0 {
        return Err(invalid("channel.port", "Must be non-zero to connect"));
    }
    Ok(())
}
