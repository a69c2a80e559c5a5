//! Rule-file validation errors and semantic validation.

use ipnet::IpNet;
use std::collections::HashSet;
use std::net::IpAddr;
use thiserror::Error;

use crate::rules::{RuleFile, RuleSpec, SegmentSpec};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Rule-file validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Duplicate metric {metric} in {rule}")]
    DuplicateMetric { rule: String, metric: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::DuplicateMetric { .. } => 20,
        }
    }
}

impl From<ValidationError> for ft_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::DuplicateMetric { metric, .. } => {
                ft_common::Error::DuplicateMetric { metric }
            }
            other => ft_common::Error::Config(other.to_string()),
        }
    }
}

/// Parse a CIDR block; a bare address is taken as a host prefix.
pub fn parse_cidr(raw: &str) -> Result<IpNet, String> {
    let s = raw.trim();
    if let Ok(net) = s.parse::<IpNet>() {
        return Ok(net.trunc());
    }
    s.parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|_| format!("'{}' is not a CIDR block or IP address", s))
}

/// Validate a whole rule file semantically.
pub fn validate_rule_file(file: &RuleFile) -> ValidationResult<()> {
    if let Some(ref start) = file.model.start_time {
        start.resolve().map_err(|e| ValidationError::InvalidValue {
            field: "model.start_time".to_string(),
            message: e.to_string(),
        })?;
    }

    if let Some(0) = file.model.active_timeout {
        return Err(ValidationError::InvalidValue {
            field: "model.active_timeout".to_string(),
            message: "Must be positive, got 0".to_string(),
        });
    }

    if file.rules.is_empty() {
        return Err(ValidationError::SemanticError(
            "rule file defines no rules".to_string(),
        ));
    }

    for (index, rule) in file.rules.iter().enumerate() {
        validate_rule(index, rule)?;
    }

    Ok(())
}

/// Validate a single rule.
pub fn validate_rule(index: usize, rule: &RuleSpec) -> ValidationResult<()> {
    let label = rule.label(index);

    if rule.metrics.is_empty() {
        return Err(ValidationError::SemanticError(format!(
            "{} has no metrics",
            label
        )));
    }

    let mut seen = HashSet::new();
    for (m_index, metric) in rule.metrics.iter().enumerate() {
        if !ft_math::is_valid_tolerance(metric.tolerance) {
            return Err(ValidationError::InvalidValue {
                field: format!("rules[{}].metrics[{}].tolerance", index, m_index),
                message: format!("Must be in [0, 1], got {}", metric.tolerance),
            });
        }
        if !seen.insert(metric.metric) {
            return Err(ValidationError::DuplicateMetric {
                rule: label,
                metric: metric.metric.to_string().to_uppercase(),
            });
        }
    }

    match &rule.segment {
        None => {}
        Some(SegmentSpec::Subnet { source, dest, .. }) => {
            for (side, value) in [("source", source), ("dest", dest)] {
                if let Some(raw) = value {
                    parse_cidr(raw).map_err(|message| ValidationError::InvalidValue {
                        field: format!("rules[{}].segment.subnet.{}", index, side),
                        message,
                    })?;
                }
            }
        }
        Some(SegmentSpec::Time { start, end }) => {
            let mut bounds = [None, None];
            for (slot, (side, value)) in [("start", start), ("end", end)].into_iter().enumerate() {
                if let Some(spec) = value {
                    let ts = spec.resolve().map_err(|e| ValidationError::InvalidValue {
                        field: format!("rules[{}].segment.time.{}", index, side),
                        message: e.to_string(),
                    })?;
                    bounds[slot] = Some(ts);
                }
            }
            if let [Some(start), Some(end)] = bounds {
                if start > end {
                    return Err(ValidationError::SemanticError(format!(
                        "{}: time segment starts after it ends ({} > {})",
                        label, start, end
                    )));
                }
            }
        }
    }

    Ok(())
}
