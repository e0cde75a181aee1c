//! Fuzz target for TOML configuration parsing and validation.
//!
//! Parsing and validation should never panic, only return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;
use ts_config::{parse_config, validate_config, ConfigFormat};

fuzz_target!(|data: &str| {
    if let Ok(config) = parse_config(data, ConfigFormat::Toml, Path::new("fuzz.toml")) {
        let _ = validate_config(&config);
    }
});
