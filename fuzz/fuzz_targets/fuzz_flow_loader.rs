//! Fuzz target for flow file parsing.
//!
//! Tests that `parse_flows` handles arbitrary CSV content without panicking.

#![no_main]

use ft_analyzer::flows::parse_flows;
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &str| {
    // The parser should never panic, only return a LoadError
    let _ = parse_flows(data, Path::new("fuzz.csv"));
});
