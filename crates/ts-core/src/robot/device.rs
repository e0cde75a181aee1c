//! Actuator and sensor contracts of the robot endpoint.
//!
//! The Act task talks to an [`Actuator`], the Sense task (in `sensor` mode)
//! to a [`SensorSource`]. Implementations are chosen from config when the
//! robot endpoint starts; the tasks never branch on which one they hold.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("motion failed: {0}")]
    Motion(String),

    #[error("speech failed: {0}")]
    Speech(String),

    #[error("sensor read failed: {0}")]
    Sensor(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("device bridge error: {0}")]
    Bridge(String),
}

impl From<DeviceError> for ts_common::Error {
    fn from(err: DeviceError) -> Self {
        ts_common::Error::Device(err.to_string())
    }
}

/// Motion and speech collaborator.
pub trait Actuator: Send {
    /// Interpolate `joints` to `angles` over `speeds` seconds; blocks until done.
    fn move_to(
        &mut self,
        joints: &[&str],
        angles: &[f64],
        speeds: &[f64],
    ) -> Result<(), DeviceError>;

    /// Speak and wait for completion.
    fn say(&mut self, utterance: &str) -> Result<(), DeviceError>;

    /// Speak without waiting.
    fn post_say(&mut self, utterance: &str) -> Result<(), DeviceError>;
}

/// Raw touch sensor. Any intensity `> 0.0` is contact.
pub trait SensorSource: Send {
    fn read_touch_intensity(&mut self) -> Result<f64, DeviceError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn move_to(
        &mut self,
        joints: &[&str],
        angles: &[f64],
        speeds: &[f64],
    ) -> Result<(), DeviceError> {
        (**self).move_to(joints, angles, speeds)
    }

    fn say(&mut self, utterance: &str) -> Result<(), DeviceError> {
        (**self).say(utterance)
    }

    fn post_say(&mut self, utterance: &str) -> Result<(), DeviceError> {
        (**self).post_say(utterance)
    }
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn read_touch_intensity(&mut self) -> Result<f64, DeviceError> {
        (**self).read_touch_intensity()
    }
}

/// Check a move command has one angle and one speed per joint.
pub fn check_move(joints: &[&str], angles: &[f64], speeds: &[f64]) -> Result<(), DeviceError> {
    if joints.is_empty() || joints.len() != angles.len() || joints.len() != speeds.len() {
        return Err(DeviceError::InvalidCommand(format!(
            "{} joints, {} angles, {} speeds",
            joints.len(),
            angles.len(),
            speeds.len()
        )));
    }
    if angles.iter().chain(speeds).any(|v| !v.is_finite()) {
        return Err(DeviceError::InvalidCommand("non-finite angle or speed".to_string()));
    }
    Ok(())
}

/// One call recorded by [`SimulatedActuator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ActuatorCommand {
    MoveTo {
        joints: Vec<String>,
        angles: Vec<f64>,
        speeds: Vec<f64>,
    },
    Say {
        text: String,
    },
    PostSay {
        text: String,
    },
}

/// Shared log of simulated actuator calls.
pub type CommandLog = Arc<Mutex<Vec<ActuatorCommand>>>;

/// In-process actuator that records every command.
#[derive(Debug, Default)]
pub struct SimulatedActuator {
    log: CommandLog,
    motion_delay: Duration,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long per move to mimic motion latency.
    pub fn with_motion_delay(mut self, delay: Duration) -> Self {
        self.motion_delay = delay;
        self
    }

    /// Handle to the command log for inspection after the run.
    pub fn log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }

    fn record(&self, command: ActuatorCommand) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

impl Actuator for SimulatedActuator {
    fn move_to(
        &mut self,
        joints: &[&str],
        angles: &[f64],
        speeds: &[f64],
    ) -> Result<(), DeviceError> {
        check_move(joints, angles, speeds)?;
        if !self.motion_delay.is_zero() {
            std::thread::sleep(self.motion_delay);
        }
        self.record(ActuatorCommand::MoveTo {
            joints: joints.iter().map(|j| j.to_string()).collect(),
            angles: angles.to_vec(),
            speeds: speeds.to_vec(),
        });
        Ok(())
    }

    fn say(&mut self, utterance: &str) -> Result<(), DeviceError> {
        self.record(ActuatorCommand::Say {
            text: utterance.to_string(),
        });
        Ok(())
    }

    fn post_say(&mut self, utterance: &str) -> Result<(), DeviceError> {
        self.record(ActuatorCommand::PostSay {
            text: utterance.to_string(),
        });
        Ok(())
    }
}

/// Sensor that replays a fixed sequence of intensities, then reads 0.0.
#[derive(Debug, Default)]
pub struct SimulatedSensor {
    readings: VecDeque<f64>,
}

impl SimulatedSensor {
    pub fn new(readings: impl IntoIterator<Item = f64>) -> Self {
        SimulatedSensor {
            readings: readings.into_iter().collect(),
        }
    }

    /// A sensor that never registers contact.
    pub fn idle() -> Self {
        Self::default()
    }
}

impl SensorSource for SimulatedSensor {
    fn read_touch_intensity(&mut self) -> Result<f64, DeviceError> {
        Ok(self.readings.pop_front().unwrap_or(0.0))
    }
}
