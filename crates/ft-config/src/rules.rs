//! Rule-file model.
//!
//! A rule file holds optional `[model]` settings and a list of `[[rules]]`,
//! each a set of metrics with tolerances plus an optional segment.
//!
//! ```toml
//! [model]
//! active_timeout = 300
//! inactive_timeout = 30
//!
//! [[rules]]
//! metrics = [ { metric = "packets", tolerance = 0.0 } ]
//! segment = { subnet = { source = "192.168.187.0/24", dest = "212.24.128.0/24", bidir = true } }
//! ```

use ft_common::{parse_timestamp, TimestampError, TimestampMs};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::settings::OffsetScope;
use crate::validate::{ValidationError, ValidationResult};

/// Complete rule file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// `[model]` section: construction parameters of the statistical model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// Active timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_timeout: Option<u64>,
    /// Inactive timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive_timeout: Option<u64>,
    /// Absolute instant that relative flow timestamps count from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimestampSpec>,
    /// Which datasets the start time applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_scope: Option<OffsetScope>,
}

/// One comparison rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Optional label used in diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub metrics: Vec<MetricSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<SegmentSpec>,
}

impl RuleSpec {
    /// Label for diagnostics: the explicit name or the 1-based position.
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("rule #{}", index + 1))
    }
}

/// Metric with its tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSpec {
    pub metric: MetricName,
    pub tolerance: f64,
}

/// Metric names accepted in rule files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricName {
    #[serde(alias = "PACKETS")]
    Packets,
    #[serde(alias = "BYTES")]
    Bytes,
    #[serde(alias = "FLOWS")]
    Flows,
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricName::Packets => write!(f, "packets"),
            MetricName::Bytes => write!(f, "bytes"),
            MetricName::Flows => write!(f, "flows"),
        }
    }
}

/// Segment restricting a rule to part of the traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSpec {
    Subnet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest: Option<String>,
        #[serde(default)]
        bidir: bool,
    },
    Time {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<TimestampSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<TimestampSpec>,
    },
}

/// Timestamp written either as epoch milliseconds or as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampSpec {
    Millis(i64),
    Text(String),
}

impl TimestampSpec {
    pub fn resolve(&self) -> Result<TimestampMs, TimestampError> {
        match self {
            TimestampSpec::Millis(ms) => Ok(*ms),
            TimestampSpec::Text(s) => parse_timestamp(s),
        }
    }
}

impl RuleFile {
    /// Load a rule file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse a rule file from a TOML string.
    pub fn from_toml_str(content: &str) -> ValidationResult<Self> {
        toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Parse a rule file from a JSON string.
    pub fn from_json_str(content: &str) -> ValidationResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }
}
