//! Duplex channel between the decision endpoint and the robot endpoint.

pub mod link;
pub mod wire;

pub use link::{ChannelError, DecisionLink, DecisionListener, RobotLink};
pub use wire::{RobotMessage, WireError, END_TOKEN, MAX_MESSAGE_BYTES};

use ts_common::{Observation, Position};

/// Decision side of the channel as seen by the control loop.
pub trait DecisionTransport {
    /// Block for the next robot message (bounded by the channel timeout).
    fn receive(&mut self) -> Result<RobotMessage, ChannelError>;

    fn send_position(&mut self, position: Position) -> Result<(), ChannelError>;

    /// Best-effort close. Never fails.
    fn close(&mut self);
}

/// Robot side of the channel as seen by the Act task.
pub trait RobotTransport {
    fn send_observation(&mut self, observation: Observation) -> Result<(), ChannelError>;

    /// Block for the decision endpoint's position reply.
    fn receive_position(&mut self) -> Result<Position, ChannelError>;

    fn send_end(&mut self) -> Result<(), ChannelError>;

    fn close(&mut self);
}
