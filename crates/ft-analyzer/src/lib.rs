//! Flow Analyzer Library
//!
//! Validates the output of a flow exporter under test against a trusted
//! reference dataset:
//! - Flow file loading with strict schema checks
//! - Reconciliation of flows split by active-timeout expiry
//! - Subnet and time segment filtering
//! - Tolerance-based metric comparison and pass/fail reporting
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod flows;
pub mod logging;
pub mod model;
pub mod report;

pub use flows::{load_flows, reconcile, LoadError, ReconcileError, ReconcileStats, Timeouts};
pub use model::{
    rules_from_file, Dataset, DatasetRole, InputError, Metric, MetricError, MetricType, ModelError,
    Rule, RuleError, Segment, SegmentError, StatisticalModel, SubnetSegment, TestOutcome,
    TimeSegment,
};
pub use report::StatisticalReport;
