//! Configuration snapshots for run telemetry and reproducibility.
//!
//! A snapshot captures the configuration state at the start of a run so
//! that a recorded history can be tied back to the settings that produced it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::load::{compute_hash, ResolvedConfig};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Schema version of the configuration.
    pub schema_version: String,

    /// Source of the configuration.
    pub source: String,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// SHA-256 hash of the file content.
    #[serde(default)]
    pub content_hash: Option<String>,

    /// SHA-256 hash of the effective configuration (after overrides).
    pub effective_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub channel: String,
    pub cycles: u64,
    pub device: String,
    pub sense_mode: String,
    pub prior_mode: String,
    pub precisions: [f64; 4],
}

impl ConfigSnapshot {
    pub fn capture(resolved: &ResolvedConfig) -> Self {
        let cfg = &resolved.config;
        let effective = serde_json::to_string(cfg).unwrap_or_default();
        ConfigSnapshot {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            source: resolved.source.to_string(),
            path: resolved.path.clone(),
            content_hash: resolved.content_hash.clone(),
            effective_hash: compute_hash(&effective),
            summary: ConfigSummary {
                channel: cfg.channel.address(),
                cycles: cfg.robot.cycles,
                device: cfg.robot.device.to_string(),
                sense_mode: cfg.sense.mode.to_string(),
                prior_mode: cfg.inference.prior_mode.to_string(),
                precisions: [cfg.model.zeta, cfg.model.omega, cfg.model.rho, cfg.model.gamma],
            },
        }
    }
}
