//! Decision endpoint state machine.
//!
//! ```text
//! AwaitingObservation -> Inferring -> PolicyScoring -> Acting -> AwaitingObservation
//!          |                                                      (one cycle)
//!          +-- end token or channel failure --> Closed
//! ```
//!
//! Single-threaded and strictly sequential: no step is skipped or reordered.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use ts_common::Error;

use super::engine::{DecisionEngine, RunHistory};
use crate::channel::{DecisionTransport, RobotMessage};
use crate::logging::{event_names, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingObservation,
    Inferring,
    PolicyScoring,
    Acting,
    Closed,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoopState::AwaitingObservation => "awaiting_observation",
            LoopState::Inferring => "inferring",
            LoopState::PolicyScoring => "policy_scoring",
            LoopState::Acting => "acting",
            LoopState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Drives a [`DecisionEngine`] over a [`DecisionTransport`] until the robot
/// endpoint sends the end token.
pub struct ControlLoop<T, R = StdRng> {
    engine: DecisionEngine<R>,
    transport: T,
    state: LoopState,
}

impl<T: DecisionTransport, R: Rng> ControlLoop<T, R> {
    pub fn new(engine: DecisionEngine<R>, transport: T) -> Self {
        ControlLoop {
            engine,
            transport,
            state: LoopState::AwaitingObservation,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn engine(&self) -> &DecisionEngine<R> {
        &self.engine
    }

    /// Steps recorded so far (also available after a failed run).
    pub fn history(&self) -> &RunHistory {
        self.engine.history()
    }

    fn enter(&mut self, next: LoopState) {
        tracing::trace!(from = %self.state, to = %next, "loop transition");
        self.state = next;
    }

    /// Run cycles until the end token. Channel or protocol failures close the
    /// transport and are returned as errors.
    pub fn run(&mut self) -> Result<RunHistory, Error> {
        if self.state == LoopState::Closed {
            return Err(Error::ChannelClosed);
        }
        loop {
            match self.cycle() {
                Ok(true) => {}
                Ok(false) => {
                    self.close();
                    crate::log_event!(
                        INFO,
                        event_names::CHANNEL_CLOSED,
                        Stage::Channel,
                        "Robot endpoint sent the end token",
                        cycles = self.engine.history().steps.len() as u64,
                    );
                    return Ok(self.engine.history().clone());
                }
                Err(err) => {
                    self.close();
                    crate::log_event!(
                        ERROR,
                        event_names::CHANNEL_ERROR,
                        Stage::Channel,
                        "Control loop stopped",
                        error = tracing::field::display(&err),
                        code = err.code() as u64,
                    );
                    return Err(err);
                }
            }
        }
    }

    /// One cycle. `Ok(false)` when the end token arrived.
    fn cycle(&mut self) -> Result<bool, Error> {
        self.enter(LoopState::AwaitingObservation);
        let observation = match self.transport.receive()? {
            RobotMessage::End => return Ok(false),
            RobotMessage::Observation(o) => o,
        };

        let cycle = self.engine.next_cycle();
        let span = tracing::info_span!("cycle", cycle = cycle);
        let _enter = span.enter();
        crate::log_event!(
            DEBUG,
            event_names::CYCLE_OBSERVATION,
            Stage::Sense,
            "Received observation",
            touched = observation.is_touched(),
        );

        self.enter(LoopState::Inferring);
        let outcome = self.engine.infer(observation)?;

        self.enter(LoopState::PolicyScoring);
        let policy = self.engine.score(&outcome.belief);

        self.enter(LoopState::Acting);
        let record = self.engine.act(observation, &outcome, &policy)?;
        self.transport.send_position(record.position)?;
        Ok(true)
    }

    fn close(&mut self) {
        self.transport.close();
        self.enter(LoopState::Closed);
    }

    pub fn into_parts(self) -> (DecisionEngine<R>, T) {
        (self.engine, self.transport)
    }
}
