//! Statistical model data types.
//!
//! - [`Metric`]: a metric type with its tolerance
//! - [`Segment`]: subnet pair or time window scoping a rule
//! - [`Rule`]: metrics plus an optional segment
//! - [`TestOutcome`]: one evaluated metric under one segment

use chrono::{DateTime, Utc};
use ft_common::time::from_datetime;
use ft_common::{format_timestamp, TimestampMs};
use ft_config::validate::parse_cidr;
use ft_math::Comparison;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregated quantity compared between datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricType {
    /// Sum of packet counters.
    Packets,
    /// Sum of byte counters.
    Bytes,
    /// Number of logical flows.
    Flows,
}

impl MetricType {
    pub const ALL: [MetricType; 3] = [MetricType::Packets, MetricType::Bytes, MetricType::Flows];
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricType::Packets => write!(f, "PACKETS"),
            MetricType::Bytes => write!(f, "BYTES"),
            MetricType::Flows => write!(f, "FLOWS"),
        }
    }
}

impl From<ft_config::MetricName> for MetricType {
    fn from(name: ft_config::MetricName) -> Self {
        match name {
            ft_config::MetricName::Packets => MetricType::Packets,
            ft_config::MetricName::Bytes => MetricType::Bytes,
            ft_config::MetricName::Flows => MetricType::Flows,
        }
    }
}

/// Metric construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("tolerance {tolerance} for {metric} is outside the interval [0.0, 1.0]")]
    ToleranceOutOfRange { metric: MetricType, tolerance: f64 },
}

/// A metric type with the largest acceptable relative difference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    key: MetricType,
    tolerance: f64,
}

impl Metric {
    /// Fails unless `tolerance` lies in [0.0, 1.0].
    pub fn new(key: MetricType, tolerance: f64) -> Result<Self, MetricError> {
        if !ft_math::is_valid_tolerance(tolerance) {
            return Err(MetricError::ToleranceOutOfRange {
                metric: key,
                tolerance,
            });
        }
        Ok(Metric { key, tolerance })
    }

    pub fn key(&self) -> MetricType {
        self.key
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

/// Segment construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("invalid subnet: {0}")]
    InvalidSubnet(String),

    #[error("invalid time bound: {0}")]
    InvalidTime(String),
}

/// Traffic between two networks.
///
/// An absent side matches any address. Only the record's forward
/// addresses are tested; `bidir` also accepts the swapped match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SubnetSegment {
    pub source: Option<IpNet>,
    pub dest: Option<IpNet>,
    pub bidir: bool,
}

impl SubnetSegment {
    /// Build from textual CIDR blocks (a bare address is a host prefix).
    pub fn new(source: Option<&str>, dest: Option<&str>, bidir: bool) -> Result<Self, SegmentError> {
        let parse = |raw: Option<&str>| {
            raw.map(parse_cidr)
                .transpose()
                .map_err(SegmentError::InvalidSubnet)
        };
        Ok(SubnetSegment {
            source: parse(source)?,
            dest: parse(dest)?,
            bidir,
        })
    }
}

impl std::fmt::Display for SubnetSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = |net: &Option<IpNet>| net.map_or_else(|| "ANY".to_string(), |n| n.to_string());
        let sign = if self.bidir { "<->" } else { "->" };
        write!(f, "{} {} {}", side(&self.source), sign, side(&self.dest))
    }
}

/// Time window on the absolute timeline, both bounds inclusive.
///
/// A record belongs to the window when it starts at or after `start` and
/// ends at or before `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeSegment {
    pub start: Option<TimestampMs>,
    pub end: Option<TimestampMs>,
}

impl TimeSegment {
    pub fn new(start: Option<TimestampMs>, end: Option<TimestampMs>) -> Self {
        TimeSegment { start, end }
    }

    pub fn from_datetimes(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        TimeSegment {
            start: start.map(from_datetime),
            end: end.map(from_datetime),
        }
    }
}

impl std::fmt::Display for TimeSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = |ts: Option<TimestampMs>| ts.map_or_else(|| "ANY".to_string(), format_timestamp);
        write!(f, "{} -> {}", bound(self.start), bound(self.end))
    }
}

/// Subset of the traffic a rule is evaluated on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Subnet(SubnetSegment),
    Time(TimeSegment),
}

impl From<SubnetSegment> for Segment {
    fn from(segment: SubnetSegment) -> Self {
        Segment::Subnet(segment)
    }
}

impl From<TimeSegment> for Segment {
    fn from(segment: TimeSegment) -> Self {
        Segment::Time(segment)
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Subnet(s) => write!(f, "{}", s),
            Segment::Time(t) => write!(f, "{}", t),
        }
    }
}

/// Metrics evaluated together on one segment.
///
/// Duplicate metric types are rejected when the rule is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub metrics: Vec<Metric>,
    pub segment: Option<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Rule {
    pub fn new(metrics: Vec<Metric>, segment: Option<Segment>) -> Self {
        Rule {
            metrics,
            segment,
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// First metric type that appears more than once.
    pub fn duplicate_metric(&self) -> Option<MetricType> {
        self.metrics.iter().enumerate().find_map(|(i, m)| {
            self.metrics[..i]
                .iter()
                .any(|earlier| earlier.key == m.key)
                .then_some(m.key)
        })
    }
}

/// Result of evaluating one metric under one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    pub metric: Metric,
    pub segment: Option<Segment>,
    /// Aggregate over the candidate dataset.
    pub value: u64,
    /// Aggregate over the reference dataset.
    pub reference: u64,
    /// Relative difference of the two aggregates.
    pub diff: f64,
}

impl TestOutcome {
    pub fn new(metric: Metric, segment: Option<Segment>, value: u64, reference: u64) -> Self {
        let cmp = Comparison::new(value, reference);
        TestOutcome {
            metric,
            segment,
            value,
            reference,
            diff: cmp.difference,
        }
    }

    pub fn is_passing(&self) -> bool {
        ft_math::within_tolerance(self.diff, self.metric.tolerance)
    }
}
