//! Fuzz target for timestamp parsing.

#![no_main]

use ft_common::{format_timestamp, parse_timestamp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(ts) = parse_timestamp(data) {
        let _ = format_timestamp(ts);
    }
});
