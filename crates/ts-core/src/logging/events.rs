//! Structured event definitions for logging.
//!
//! Events follow a consistent schema for machine-parseable JSONL output.
//! All events carry the run correlation ID, the endpoint role, and a stage.
//! Event names double as tracing targets.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Stages of one control cycle, plus run setup and teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Channel setup and message exchange.
    Channel,
    /// Touch sensing on the robot endpoint.
    Sense,
    /// Belief update.
    Infer,
    /// Policy scoring and action selection.
    Decide,
    /// Motion on the robot endpoint.
    Act,
    /// Task shutdown and history export.
    Shutdown,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Channel => "channel",
            Stage::Sense => "sense",
            Stage::Infer => "infer",
            Stage::Decide => "decide",
            Stage::Act => "act",
            Stage::Shutdown => "shutdown",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";
    pub const RUN_FAILED: &str = "run.failed";

    // Channel
    pub const CHANNEL_LISTENING: &str = "channel.listening";
    pub const CHANNEL_CONNECTED: &str = "channel.connected";
    pub const CHANNEL_CLOSED: &str = "channel.closed";
    pub const CHANNEL_ERROR: &str = "channel.error";

    // Decision endpoint
    pub const CYCLE_OBSERVATION: &str = "cycle.observation";
    pub const INFER_FINISHED: &str = "infer.finished";
    pub const INFER_NOT_CONVERGED: &str = "infer.not_converged";
    pub const DECIDE_POLICIES: &str = "decide.policies";
    pub const DECIDE_ACTION: &str = "decide.action";

    // Robot endpoint
    pub const SENSE_STARTED: &str = "sense.started";
    pub const SENSE_TOUCH: &str = "sense.touch";
    pub const SENSE_SKIPPED_TIMESTEP: &str = "sense.skipped_timestep";
    pub const SENSE_DEVICE_ERROR: &str = "sense.device_error";
    pub const SENSE_STOPPED: &str = "sense.stopped";
    pub const ACT_READ: &str = "act.read";
    pub const ACT_MOVED: &str = "act.moved";
    pub const ACT_DEVICE_ERROR: &str = "act.device_error";
    pub const ACT_SENSE_LAGGING: &str = "act.sense_lagging";
    pub const ACT_FINISHED: &str = "act.finished";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
}

/// Context for generating log events with a consistent run ID and role.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub role: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, role: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            role: role.into(),
        }
    }

    /// Root span for the run; JSONL output picks `run_id` and `role` up from it.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("run", run_id = %self.run_id, role = %self.role)
    }
}
