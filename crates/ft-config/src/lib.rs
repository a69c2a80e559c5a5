//! Flow analyzer rule-file loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for rule files (TOML or JSON)
//! - Semantic validation of metrics, segments and timeouts
//! - Model settings resolution (CLI overrides → rule file → defaults)

pub mod rules;
pub mod settings;
pub mod validate;

pub use rules::{MetricName, MetricSpec, ModelSection, RuleFile, RuleSpec, SegmentSpec, TimestampSpec};
pub use settings::{ModelSettings, OffsetScope, SettingsOverrides};
pub use validate::{validate_rule_file, ValidationError, ValidationResult};

/// Active timeout applied when neither the CLI nor the rule file sets one.
pub const DEFAULT_ACTIVE_TIMEOUT_SECS: u64 = 300;

/// Inactive timeout applied when neither the CLI nor the rule file sets one.
pub const DEFAULT_INACTIVE_TIMEOUT_SECS: u64 = 30;
