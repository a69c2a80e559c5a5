//! Error types for the flow analyzer.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Malformed Flow File
//!   Reason: flows.csv:14: column PACKETS: invalid digit found in string
//!   Fix: Check the flow file against the documented column schema.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 12,
//!   "category": "input",
//!   "message": "flows.csv:14: column PACKETS: invalid digit found in string",
//!   "context": { "path": "flows.csv", "line": 14 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for analyzer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Flow files: missing, unreadable, malformed, unorderable.
    Input,
    /// Comparison rule definitions.
    Rule,
    /// Out-of-range parameters (tolerances).
    Parameter,
    /// Rule files and CLI configuration.
    Config,
    /// Output I/O and serialization.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Rule => write!(f, "rule"),
            ErrorCategory::Parameter => write!(f, "parameter"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the flow analyzer.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("flow file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("cannot read flow file {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("{}:{line}: {message}", path.display())]
    MalformedFlow {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("flow reconciliation failed: {0}")]
    Reconciliation(String),

    // Rule errors (20-29)
    #[error("metric {metric} used more than once in a single rule")]
    DuplicateMetric { metric: String },

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    // Parameter errors (30-39)
    #[error("tolerance {tolerance} is outside the interval [0.0, 1.0]")]
    ToleranceOutOfRange { tolerance: f64 },

    // Configuration errors (40-49)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Input errors
    /// - 20-29: Rule errors
    /// - 30-39: Parameter errors
    /// - 40-49: Configuration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::FileNotFound { .. } => 10,
            Error::Unreadable { .. } => 11,
            Error::MalformedFlow { .. } => 12,
            Error::Reconciliation(_) => 13,
            Error::DuplicateMetric { .. } => 20,
            Error::InvalidRule(_) => 21,
            Error::ToleranceOutOfRange { .. } => 30,
            Error::Config(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileNotFound { .. }
            | Error::Unreadable { .. }
            | Error::MalformedFlow { .. }
            | Error::Reconciliation(_) => ErrorCategory::Input,

            Error::DuplicateMetric { .. } | Error::InvalidRule(_) => ErrorCategory::Rule,

            Error::ToleranceOutOfRange { .. } => ErrorCategory::Parameter,

            Error::Config(_) => ErrorCategory::Config,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::FileNotFound { .. } => {
                "Check the path. Candidate and reference files must exist before validation starts."
            }
            Error::Unreadable { .. } => "Check file permissions and that the path is a regular file.",
            Error::MalformedFlow { .. } => {
                "Check the flow file against the documented column schema (SRC_IP, DST_IP, START_TIME, ...)."
            }
            Error::Reconciliation(_) => {
                "A record has its end before its start. Fix the exporter output or the reference capture."
            }
            Error::DuplicateMetric { .. } => {
                "Each metric type may appear once per rule. Split the metrics into separate rules."
            }
            Error::InvalidRule(_) => "Fix the rule definition and run 'ft-analyzer check'.",
            Error::ToleranceOutOfRange { .. } => {
                "Tolerances are relative differences and must lie within [0.0, 1.0]."
            }
            Error::Config(_) => "Run 'ft-analyzer check --rules <file>' to validate the rule file.",
            Error::Io(_) => "Check disk space and permissions, then retry.",
            Error::Json(_) => "Internal serialization failure. Retry with '--format text'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::FileNotFound { .. } => "Flow File Not Found",
            Error::Unreadable { .. } => "Flow File Unreadable",
            Error::MalformedFlow { .. } => "Malformed Flow File",
            Error::Reconciliation(_) => "Flow Reconciliation Failed",
            Error::DuplicateMetric { .. } => "Duplicate Metric In Rule",
            Error::InvalidRule(_) => "Invalid Rule",
            Error::ToleranceOutOfRange { .. } => "Tolerance Out Of Range",
            Error::Config(_) => "Configuration Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Additional structured context (e.g., path, line).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::FileNotFound { path } | Error::Unreadable { path, .. } => {
                context.insert("path".to_string(), serde_json::json!(path));
            }
            Error::MalformedFlow { path, line, .. } => {
                context.insert("path".to_string(), serde_json::json!(path));
                context.insert("line".to_string(), serde_json::json!(line));
            }
            Error::DuplicateMetric { metric } => {
                context.insert("metric".to_string(), serde_json::json!(metric));
            }
            Error::ToleranceOutOfRange { tolerance } => {
                context.insert("tolerance".to_string(), serde_json::json!(tolerance));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            Error::FileNotFound {
                path: "x.csv".into()
            }
            .code(),
            10
        );
        assert_eq!(
            Error::DuplicateMetric {
                metric: "PACKETS".into()
            }
            .code(),
            20
        );
        assert_eq!(Error::ToleranceOutOfRange { tolerance: 1.1 }.code(), 30);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::Reconciliation("reversed".into()).category(),
            ErrorCategory::Input
        );
        assert_eq!(Error::InvalidRule("x".into()).category(), ErrorCategory::Rule);
        assert_eq!(
            Error::ToleranceOutOfRange { tolerance: -1.0 }.category(),
            ErrorCategory::Parameter
        );
    }

    #[test]
    fn test_malformed_flow_message() {
        let err = Error::MalformedFlow {
            path: "flows.csv".into(),
            line: 14,
            message: "column PACKETS: invalid digit found in string".into(),
        };
        assert_eq!(
            err.to_string(),
            "flows.csv:14: column PACKETS: invalid digit found in string"
        );
    }

    #[test]
    fn test_structured_error_context() {
        let err = Error::MalformedFlow {
            path: "flows.csv".into(),
            line: 3,
            message: "bad".into(),
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 12);
        assert_eq!(structured.category, ErrorCategory::Input);
        assert_eq!(structured.context.get("line"), Some(&serde_json::json!(3)));

        let json = structured.to_json();
        assert!(json.contains(r#""category":"input""#));
    }

    #[test]
    fn test_format_error_human() {
        let err = Error::DuplicateMetric {
            metric: "PACKETS".into(),
        };
        let formatted = format_error_human(&err, false);
        assert!(formatted.contains("Duplicate Metric In Rule"));
        assert!(formatted.contains("metric PACKETS used more than once"));
        assert!(formatted.contains("Fix:"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Input.to_string(), "input");
        assert_eq!(ErrorCategory::Parameter.to_string(), "parameter");
    }
}
