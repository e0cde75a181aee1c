//! Tactile Search configuration loading and validation.
//!
//! This crate provides:
//! - Typed sections for the channel, robot, model, inference and sense settings
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Config snapshots for run telemetry

pub mod load;
pub mod resolve;
pub mod settings;
pub mod snapshot;
pub mod validate;

pub use load::{compute_hash, load_config, parse_config, ConfigError, ConfigFormat, ResolvedConfig};
pub use resolve::{resolve_config_path, ConfigSource};
pub use settings::{
    ChannelConfig, Config, DeviceKind, InferenceConfig, ModelConfig, PriorMode, RobotConfig,
    SenseConfig, SenseMode,
};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, validate_connector, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
