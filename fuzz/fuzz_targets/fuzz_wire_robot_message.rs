//! Fuzz target for robot-to-decision message parsing.
//!
//! Any accepted observation must survive a round trip through its encoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ts_core::channel::wire::{encode_observation, parse_robot_message};
use ts_core::channel::RobotMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(RobotMessage::Observation(obs)) = parse_robot_message(data) {
        let again = parse_robot_message(encode_observation(obs).as_bytes());
        assert_eq!(again, Ok(RobotMessage::Observation(obs)));
    }
});
