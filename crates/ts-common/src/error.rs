//! Error types for Tactile Search.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification matching the controller's failure model
//! - Fatality hints (whether a run must stop)
//! - Remediation suggestions for humans
//!
//! # Failure model
//!
//! | Category        | Fatal | Typical source                                  |
//! |-----------------|-------|-------------------------------------------------|
//! | `communication` | yes   | connect/send/receive failure, channel timeout   |
//! | `protocol`      | yes   | non-numeric payload that is not the end token   |
//! | `configuration` | yes   | bad precision, dimension mismatch, bad address  |
//! | `device`        | no    | actuator or sensor failure (cycle is aborted)   |
//! | `inference`     | no    | belief update hit its iteration cap             |
//! | `io`            | yes   | local file or socket setup errors               |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Tactile Search operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Duplex channel failures.
    Communication,
    /// Malformed messages on the duplex channel.
    Protocol,
    /// Startup configuration errors.
    Configuration,
    /// Actuator or sensor failures.
    Device,
    /// Degraded inference (non-fatal).
    Inference,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Communication => write!(f, "communication"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Device => write!(f, "device"),
            ErrorCategory::Inference => write!(f, "inference"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Tactile Search.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("generative model dimension mismatch: {0}")]
    DimensionMismatch(String),

    // Communication errors (30-39)
    #[error("communication error: {0}")]
    Communication(String),

    #[error("channel timed out after {seconds}s")]
    ChannelTimeout { seconds: u64 },

    #[error("channel closed by peer before termination")]
    ChannelClosed,

    // Protocol errors (40-49)
    #[error("protocol error: {0}")]
    Protocol(String),

    // Device errors (50-59)
    #[error("device error: {0}")]
    Device(String),

    // Inference errors (60-69)
    #[error("inference degraded: {0}")]
    Inference(String),

    // I/O errors (70-79)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 30-39: Communication errors
    /// - 40-49: Protocol errors
    /// - 50-59: Device errors
    /// - 60-69: Inference errors
    /// - 70-79: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Configuration(_) => 10,
            Error::DimensionMismatch(_) => 11,
            Error::Communication(_) => 30,
            Error::ChannelTimeout { .. } => 31,
            Error::ChannelClosed => 32,
            Error::Protocol(_) => 40,
            Error::Device(_) => 50,
            Error::Inference(_) => 60,
            Error::Io(_) => 70,
            Error::Json(_) => 71,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration(_) | Error::DimensionMismatch(_) => ErrorCategory::Configuration,
            Error::Communication(_) | Error::ChannelTimeout { .. } | Error::ChannelClosed => {
                ErrorCategory::Communication
            }
            Error::Protocol(_) => ErrorCategory::Protocol,
            Error::Device(_) => ErrorCategory::Device,
            Error::Inference(_) => ErrorCategory::Inference,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether this error must terminate the current run.
    ///
    /// Device failures abort only the current Act cycle; degraded inference
    /// lets the loop continue with the best available belief.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Device | ErrorCategory::Inference
        )
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Configuration(_) => {
                "Run 'ts-core check' to validate configuration and fix the reported field."
            }
            Error::DimensionMismatch(_) => {
                "The static model tables are inconsistent. This is a build defect; report it."
            }
            Error::Communication(_) => {
                "Check that the decision endpoint is listening on the configured host/port."
            }
            Error::ChannelTimeout { .. } => {
                "The peer stalled. Increase channel.timeout_secs or check the peer's logs."
            }
            Error::ChannelClosed => {
                "The peer hung up without sending 'end'. Check the peer's exit status."
            }
            Error::Protocol(_) => {
                "Peers disagree on the wire format. Ensure both endpoints run compatible versions."
            }
            Error::Device(_) => {
                "Check the robot bridge address/port and that the robot is powered and stiff."
            }
            Error::Inference(_) => {
                "Increase inference.max_iterations or loosen inference.tolerance."
            }
            Error::Io(_) => "Check permissions and that the configured paths exist.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq .' or restore from backup.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "Configuration Error",
            Error::DimensionMismatch(_) => "Model Dimension Mismatch",
            Error::Communication(_) => "Communication Error",
            Error::ChannelTimeout { .. } => "Channel Timeout",
            Error::ChannelClosed => "Channel Closed",
            Error::Protocol(_) => "Protocol Error",
            Error::Device(_) => "Device Error",
            Error::Inference(_) => "Inference Warning",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the run had to stop.
    pub fatal: bool,

    /// Remediation hint.
    pub remediation: String,

    /// Additional structured context (e.g., cycle, address).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            fatal: err.is_fatal(),
            remediation: err.remediation().to_string(),
            context: HashMap::new(),
        }
    }
}

impl StructuredError {
    /// Attach a context value.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }
}
