//! Fuzz target for reconciliation of parsed flow files.
//!
//! Anything the loader accepts must reconcile without panicking, and
//! reconciliation must keep packet totals.

#![no_main]

use ft_analyzer::flows::{parse_flows, reconcile, Timeouts};
use ft_analyzer::model::{aggregate, MetricType};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &str| {
    let Ok(records) = parse_flows(data, Path::new("fuzz.csv")) else {
        return;
    };
    if let Ok((flows, _)) = reconcile(&records, Timeouts::from_secs(300, 30)) {
        assert_eq!(
            aggregate(&flows, MetricType::Packets),
            aggregate(&records, MetricType::Packets)
        );
    }
});
