//! Fuzz target for rule file parsing.
//!
//! Tests that TOML rule parsing, validation and conversion into rules
//! handle arbitrary input without panicking.

#![no_main]

use ft_analyzer::rules_from_file;
use ft_config::{validate_rule_file, RuleFile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let Ok(file) = RuleFile::from_toml_str(data) else {
        return;
    };
    // A file that passes validation must also convert cleanly.
    if validate_rule_file(&file).is_ok() {
        assert!(rules_from_file(&file).is_ok());
    }
});
