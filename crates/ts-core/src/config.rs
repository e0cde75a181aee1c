//! Configuration loading and validation for ts-core.
//!
//! Types, resolution and validation live in `ts-config`; this module
//! re-exports them and maps failures into the unified error type.

pub use ts_config::{
    load_config, validate_config, validate_connector, ChannelConfig, Config, ConfigError,
    ConfigSnapshot, ConfigSource, DeviceKind, InferenceConfig, ModelConfig, PriorMode,
    ResolvedConfig, RobotConfig, SenseConfig, SenseMode, ValidationError,
};

use ts_common::Error;

/// Convert a config error into the unified (fatal, startup-time) error type.
pub fn config_error(err: ConfigError) -> Error {
    Error::Configuration(err.to_string())
}

/// Convert a validation error into the unified error type.
pub fn validation_error(err: ValidationError) -> Error {
    Error::Configuration(err.to_string())
}
