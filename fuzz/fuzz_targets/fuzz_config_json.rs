//! Fuzz target for JSON configuration parsing.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::path::Path;
use ts_config::{parse_config, validate_config, validate_connector, ConfigFormat};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    text: &'a str,
    connector: bool,
}

fuzz_target!(|input: Input<'_>| {
    if let Ok(config) = parse_config(input.text, ConfigFormat::Json, Path::new("fuzz.json")) {
        if validate_config(&config).is_ok() && input.connector {
            let _ = validate_connector(&config.channel);
        }
    }
});
