//! Exit codes for the ts-core CLI.
//!
//! Exit codes communicate the run outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0: Clean run
//! - 10-19: User/configuration errors (recoverable by user action)
//! - 20-29: Internal and local I/O errors
//! - 30-39: Duplex channel failures
//! - 40-49: Device failures

use ts_common::{Error, ErrorCategory};

/// Exit codes for ts-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success: run completed and the channel closed cleanly
    Clean = 0,

    /// Invalid arguments or configuration
    ArgsError = 10,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// Local I/O error
    IoError = 21,

    /// Peer stalled past the channel timeout
    TimeoutError = 22,

    /// Channel connect/send/receive failure
    CommunicationError = 30,

    /// Malformed message on the channel
    ProtocolError = 31,

    /// Actuator or sensor failure that stopped the run
    DeviceError = 40,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Check if this exit code is a user/configuration error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::TimeoutError => "ERR_TIMEOUT",
            ExitCode::CommunicationError => "ERR_COMMUNICATION",
            ExitCode::ProtocolError => "ERR_PROTOCOL",
            ExitCode::DeviceError => "ERR_DEVICE",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        if let Error::ChannelTimeout { .. } = err {
            return ExitCode::TimeoutError;
        }
        match err.category() {
            ErrorCategory::Configuration => ExitCode::ArgsError,
            ErrorCategory::Communication => ExitCode::CommunicationError,
            ErrorCategory::Protocol => ExitCode::ProtocolError,
            ErrorCategory::Device => ExitCode::DeviceError,
            ErrorCategory::Inference => ExitCode::InternalError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
