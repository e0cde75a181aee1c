//! Loading configuration files with provenance.

use crate::resolve::{resolve_config_path, ConfigSource};
use crate::settings::Config;
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_config, ValidationError};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    JsonError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid TOML in config file {path}: {source}")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::NotFound { .. } => 15,
            ConfigError::IoError { .. } => 16,
            ConfigError::JsonError { .. } | ConfigError::TomlError { .. } => 17,
            ConfigError::Validation(v) => v.code(),
        }
    }
}

/// On-disk configuration syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.toml` is TOML; anything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The effective configuration.
    pub config: Config,
    /// Path to the config file (None if using defaults).
    pub path: Option<PathBuf>,
    /// Where the path came from.
    pub source: ConfigSource,
    /// SHA-256 hash of the file content (None if using defaults).
    pub content_hash: Option<String>,
}

impl ResolvedConfig {
    /// Built-in defaults with no file behind them.
    pub fn defaults() -> Self {
        Self {
            config: Config::default(),
            path: None,
            source: ConfigSource::BuiltinDefault,
            content_hash: None,
        }
    }

    /// Re-run semantic validation (after CLI overrides, for instance).
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(&self.config)?;
        Ok(())
    }

    /// Create a config snapshot for run telemetry.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::capture(self)
    }
}

/// Load configuration with the standard resolution order, then validate it.
pub fn load_config(cli_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let (path, source) = resolve_config_path(cli_path);

    let Some(path) = path else {
        return Ok(ResolvedConfig::defaults());
    };

    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }

    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
        path: path.clone(),
        source: e,
    })?;

    let config = parse_config(&content, ConfigFormat::from_path(&path), &path)?;
    validate_config(&config)?;

    Ok(ResolvedConfig {
        config,
        content_hash: Some(compute_hash(&content)),
        path: Some(path),
        source,
    })
}

/// Parse configuration text. `path` is only used for error messages.
pub fn parse_config(
    content: &str,
    format: ConfigFormat,
    path: &Path,
) -> Result<Config, ConfigError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::TomlError {
            path: path.to_path_buf(),
            source: e,
        }),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::JsonError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Compute SHA-256 hash of content.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
