//! Fuzz target for position reply parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ts_common::NUM_POSITIONS;
use ts_core::channel::wire::{encode_position, parse_position};

fuzz_target!(|data: &[u8]| {
    if let Ok(position) = parse_position(data) {
        assert!(position.index() < NUM_POSITIONS);
        assert_eq!(parse_position(encode_position(position).as_bytes()), Ok(position));
    }
});
