//! Flow analyzer common types and errors.
//!
//! This crate provides foundational types shared across the analyzer crates:
//! - Flow records, reverse-direction counters and flow keys
//! - Millisecond timestamps and their textual forms
//! - The unified error type with stable codes
//! - Report output formats

pub mod error;
pub mod flow;
pub mod output;
pub mod time;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use flow::{FlowKey, FlowRecord, ReverseCounters};
pub use output::OutputFormat;
pub use time::{format_timestamp, parse_timestamp, TimestampError, TimestampMs};
