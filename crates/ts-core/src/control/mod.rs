//! Decision endpoint: the per-step engine and the loop that drives it.

pub mod control_loop;
pub mod engine;

pub use control_loop::{ControlLoop, LoopState};
pub use engine::{DecisionEngine, EngineSettings, HistorySummary, RunHistory, StepRecord};

use std::time::Duration;

use ts_common::Error;

use crate::channel::{DecisionLink, DecisionListener};
use crate::config::Config;
use crate::logging::{event_names, Stage};

/// Bind the configured channel address.
pub fn listen(config: &Config) -> Result<DecisionListener, Error> {
    let addr = config.channel.address();
    let listener = DecisionListener::bind(&addr, Duration::from_secs(config.channel.timeout_secs))?;
    crate::log_event!(
        INFO,
        event_names::CHANNEL_LISTENING,
        Stage::Channel,
        "Decision endpoint listening",
        addr = tracing::field::display(listener.local_addr()?),
    );
    Ok(listener)
}

/// Accept the robot endpoint on `listener` and run the control loop to the end token.
pub fn serve(listener: &DecisionListener, engine: DecisionEngine) -> Result<RunHistory, Error> {
    let link: DecisionLink = listener.accept()?;
    crate::log_event!(
        INFO,
        event_names::CHANNEL_CONNECTED,
        Stage::Channel,
        "Robot endpoint connected",
        peer = tracing::field::debug(link.peer_addr()),
    );
    ControlLoop::new(engine, link).run()
}

/// Full decision endpoint from config.
pub fn run_decision_endpoint(config: &Config, run_id: &str) -> Result<RunHistory, Error> {
    let engine = DecisionEngine::from_config(config)?.with_run_id(run_id);
    let listener = listen(config)?;
    serve(&listener, engine)
}
