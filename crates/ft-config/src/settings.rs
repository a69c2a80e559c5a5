//! Model settings resolution.
//!
//! Resolution order (highest to lowest priority):
//! 1. Explicit CLI flags (via [`SettingsOverrides`])
//! 2. The rule file's `[model]` section
//! 3. Built-in defaults

use ft_common::TimestampMs;
use serde::{Deserialize, Serialize};

use crate::rules::ModelSection;
use crate::validate::{ValidationError, ValidationResult};
use crate::{DEFAULT_ACTIVE_TIMEOUT_SECS, DEFAULT_INACTIVE_TIMEOUT_SECS};

/// Datasets whose timestamps are relative to the configured start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetScope {
    /// Candidate and reference are both relative.
    Both,
    /// Only the reference is relative; the candidate carries absolute
    /// exporter times.
    #[default]
    Reference,
}

impl std::str::FromStr for OffsetScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" | "all" => Ok(OffsetScope::Both),
            "reference" | "ref" => Ok(OffsetScope::Reference),
            _ => Err(format!("unknown offset scope: {}", s)),
        }
    }
}

impl std::fmt::Display for OffsetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetScope::Both => write!(f, "both"),
            OffsetScope::Reference => write!(f, "reference"),
        }
    }
}

/// Resolved construction parameters of a statistical model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Active timeout in seconds.
    pub active_timeout: u64,
    /// Inactive timeout in seconds.
    pub inactive_timeout: u64,
    pub start_time: Option<TimestampMs>,
    pub offset_scope: OffsetScope,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            active_timeout: DEFAULT_ACTIVE_TIMEOUT_SECS,
            inactive_timeout: DEFAULT_INACTIVE_TIMEOUT_SECS,
            start_time: None,
            offset_scope: OffsetScope::Reference,
        }
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsOverrides {
    pub active_timeout: Option<u64>,
    pub inactive_timeout: Option<u64>,
    pub start_time: Option<TimestampMs>,
    pub offset_scope: Option<OffsetScope>,
}

impl ModelSettings {
    /// Merge CLI overrides, the rule file's `[model]` section and defaults.
    pub fn resolve(section: &ModelSection, overrides: &SettingsOverrides) -> ValidationResult<Self> {
        let defaults = ModelSettings::default();

        let file_start = section
            .start_time
            .as_ref()
            .map(|spec| {
                spec.resolve().map_err(|e| ValidationError::InvalidValue {
                    field: "model.start_time".to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        let settings = ModelSettings {
            active_timeout: overrides
                .active_timeout
                .or(section.active_timeout)
                .unwrap_or(defaults.active_timeout),
            inactive_timeout: overrides
                .inactive_timeout
                .or(section.inactive_timeout)
                .unwrap_or(defaults.inactive_timeout),
            start_time: overrides.start_time.or(file_start),
            offset_scope: overrides
                .offset_scope
                .or(section.offset_scope)
                .unwrap_or(defaults.offset_scope),
        };

        settings.check()?;
        Ok(settings)
    }

    /// Semantic checks on the timeout pair.
    pub fn check(&self) -> ValidationResult<()> {
        if self.active_timeout == 0 {
            return Err(ValidationError::InvalidValue {
                field: "model.active_timeout".to_string(),
                message: "Must be positive, got 0".to_string(),
            });
        }
        Ok(())
    }

    /// Timeout pair in milliseconds, as used by reconciliation.
    pub fn timeouts_ms(&self) -> (i64, i64) {
        (
            secs_to_ms(self.active_timeout),
            secs_to_ms(self.inactive_timeout),
        )
    }
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}
