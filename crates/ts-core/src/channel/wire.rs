//! Textual wire format of the duplex channel.
//!
//! Robot to decision: `"1.0"` (not touched), `"0.0"` (touched) or `"end"`.
//! Decision to robot: an integer position `"0"`..`"7"`.
//!
//! There is no length prefix or delimiter; each message is one write on one
//! side and one read on the other. Surrounding whitespace is ignored.

use thiserror::Error;
use ts_common::{Observation, Position};

/// Termination token sent by the robot endpoint after its last cycle.
pub const END_TOKEN: &str = "end";

/// Largest message read in one call.
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// A message from the robot endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotMessage {
    Observation(Observation),
    End,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("empty message")]
    Empty,

    #[error("message is not valid UTF-8")]
    NotUtf8,

    #[error("message of {0} bytes exceeds the 1024 byte limit")]
    Oversized(usize),

    #[error("expected a number, got {0:?}")]
    NotNumeric(String),

    #[error("observation {0:?} is not 0 or 1")]
    ObservationOutOfRange(String),

    #[error("position {0:?} is outside 0..8")]
    PositionOutOfRange(String),
}

impl From<WireError> for ts_common::Error {
    fn from(err: WireError) -> Self {
        ts_common::Error::Protocol(err.to_string())
    }
}

fn text(raw: &[u8]) -> Result<&str, WireError> {
    if raw.len() > MAX_MESSAGE_BYTES {
        return Err(WireError::Oversized(raw.len()));
    }
    let s = std::str::from_utf8(raw).map_err(|_| WireError::NotUtf8)?.trim();
    if s.is_empty() {
        return Err(WireError::Empty);
    }
    Ok(s)
}

/// Encode an observation as the shared-flag value, e.g. `"1.0"`.
pub fn encode_observation(observation: Observation) -> String {
    format!("{:.1}", observation.flag())
}

pub fn encode_end() -> &'static str {
    END_TOKEN
}

/// Parse one robot message.
///
/// The value is read as a float and truncated toward zero, so `"1"`, `"1.0"`
/// and `"1.9"` all decode as not touched. Anything that is neither the end
/// token nor a finite number truncating to 0 or 1 is rejected.
pub fn parse_robot_message(raw: &[u8]) -> Result<RobotMessage, WireError> {
    let s = text(raw)?;
    if s == END_TOKEN {
        return Ok(RobotMessage::End);
    }
    let value: f64 = s.parse().map_err(|_| WireError::NotNumeric(s.to_string()))?;
    if !value.is_finite() {
        return Err(WireError::NotNumeric(s.to_string()));
    }
    let flag = value.trunc();
    if flag == 0.0 {
        Ok(RobotMessage::Observation(Observation::Touched))
    } else if flag == 1.0 {
        Ok(RobotMessage::Observation(Observation::NotTouched))
    } else {
        Err(WireError::ObservationOutOfRange(s.to_string()))
    }
}

pub fn encode_position(position: Position) -> String {
    position.index().to_string()
}

/// Parse a position reply. Only plain integers are accepted.
pub fn parse_position(raw: &[u8]) -> Result<Position, WireError> {
    let s = text(raw)?;
    let idx: i64 = s.parse().map_err(|_| WireError::NotNumeric(s.to_string()))?;
    usize::try_from(idx)
        .ok()
        .and_then(Position::new)
        .ok_or_else(|| WireError::PositionOutOfRange(s.to_string()))
}
