//! Statistical model: loads a candidate and a reference dataset once and
//! evaluates comparison rules against them.
//!
//! ```ignore
//! use ft_analyzer::{Metric, MetricType, Rule, StatisticalModel};
//!
//! let model = StatisticalModel::new("candidate.csv", "reference.csv", (300, 30), None)?;
//! let rule = Rule::new(vec![Metric::new(MetricType::Bytes, 0.05)?], None);
//! let report = model.validate(&[rule])?;
//! assert!(report.is_passing());
//! ```

pub mod aggregate;
pub mod segment;
pub mod types;

pub use aggregate::aggregate;
pub use segment::filter;
pub use types::{
    Metric, MetricError, MetricType, Rule, Segment, SegmentError, SubnetSegment, TestOutcome,
    TimeSegment,
};

use ft_common::{FlowRecord, TimestampMs};
use ft_config::{ModelSettings, OffsetScope, RuleFile, RuleSpec, SegmentSpec, ValidationError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::flows::{load_flows, reconcile, LoadError, ReconcileError, ReconcileStats, Timeouts};
use crate::logging::{event_names, Stage};
use crate::report::StatisticalReport;

/// Which side of the comparison a dataset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetRole {
    Candidate,
    Reference,
}

impl std::fmt::Display for DatasetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetRole::Candidate => write!(f, "candidate"),
            DatasetRole::Reference => write!(f, "reference"),
        }
    }
}

/// Failures while building one dataset.
#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Failures in a single rule.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("metric {0} used more than once")]
    DuplicateMetric(MetricType),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Segment(#[from] SegmentError),
}

/// Errors from model construction and rule evaluation.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{role} dataset: {source}")]
    Input {
        role: DatasetRole,
        #[source]
        source: InputError,
    },

    #[error("model settings: {0}")]
    Settings(#[from] ValidationError),

    #[error("{rule}: {source}")]
    Rule {
        /// Zero-based position in the submitted rule list.
        index: usize,
        rule: String,
        #[source]
        source: RuleError,
    },
}

impl ModelError {
    fn input(role: DatasetRole, source: impl Into<InputError>) -> Self {
        ModelError::Input {
            role,
            source: source.into(),
        }
    }

    fn rule(index: usize, rule: &Rule, source: RuleError) -> Self {
        ModelError::Rule {
            index,
            rule: rule_label(index, rule.name.as_deref()),
            source,
        }
    }
}

fn rule_label(index: usize, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("rule '{}'", name),
        None => format!("rule #{}", index + 1),
    }
}

impl From<ModelError> for ft_common::Error {
    fn from(err: ModelError) -> Self {
        use ft_common::Error;

        match err {
            ModelError::Input { source, .. } => match source {
                InputError::Load(e) => e.into(),
                InputError::Reconcile(e) => e.into(),
            },
            ModelError::Settings(e) => e.into(),
            ModelError::Rule { rule, source, .. } => match source {
                RuleError::DuplicateMetric(metric) => Error::DuplicateMetric {
                    metric: metric.to_string(),
                },
                RuleError::Metric(MetricError::ToleranceOutOfRange { tolerance, .. }) => {
                    Error::ToleranceOutOfRange { tolerance }
                }
                RuleError::Segment(e) => Error::InvalidRule(format!("{}: {}", rule, e)),
            },
        }
    }
}

/// One side of the comparison: raw records and their reconciled flows.
#[derive(Debug, Clone)]
pub struct Dataset {
    role: DatasetRole,
    path: Option<PathBuf>,
    raw_len: usize,
    flows: Vec<FlowRecord>,
    stats: ReconcileStats,
}

impl Dataset {
    /// Load `path`, shift by `offset` and reconcile.
    pub fn load(
        role: DatasetRole,
        path: &Path,
        offset: Option<TimestampMs>,
        timeouts: Timeouts,
    ) -> Result<Self, ModelError> {
        let records = load_flows(path).map_err(|e| ModelError::input(role, e))?;
        info!(
            event = event_names::DATASET_LOADED,
            stage = %Stage::Load,
            role = %role,
            path = %path.display(),
            rows = records.len(),
            "Loaded {} dataset",
            role
        );
        let mut dataset = Self::from_records(role, records, offset, timeouts)?;
        dataset.path = Some(path.to_path_buf());
        Ok(dataset)
    }

    /// Build from records already in memory.
    pub fn from_records(
        role: DatasetRole,
        mut records: Vec<FlowRecord>,
        offset: Option<TimestampMs>,
        timeouts: Timeouts,
    ) -> Result<Self, ModelError> {
        if let Some(offset) = offset {
            for rec in &mut records {
                rec.shift(offset);
            }
        }

        let (flows, stats) = reconcile(&records, timeouts).map_err(|e| ModelError::input(role, e))?;
        info!(
            event = event_names::RECONCILE_FINISHED,
            stage = %Stage::Reconcile,
            role = %role,
            records_in = stats.records_in,
            flows_out = stats.flows_out,
            merges = stats.merges,
            "Reconciled {} dataset",
            role
        );

        Ok(Dataset {
            role,
            path: None,
            raw_len: records.len(),
            flows,
            stats,
        })
    }

    pub fn role(&self) -> DatasetRole {
        self.role
    }

    /// Source file, when loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of records before reconciliation.
    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    /// Reconciled logical flows.
    pub fn flows(&self) -> &[FlowRecord] {
        &self.flows
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Aggregate `metric` over the flows in `segment`.
    pub fn aggregate(&self, metric: MetricType, segment: Option<&Segment>) -> u64 {
        aggregate(filter(&self.flows, segment), metric)
    }
}

/// Candidate and reference datasets, loaded and reconciled once.
///
/// Holds no outcome state: every [`validate`](Self::validate) call
/// produces an independent report.
#[derive(Debug, Clone)]
pub struct StatisticalModel {
    candidate: Dataset,
    reference: Dataset,
    settings: ModelSettings,
}

impl StatisticalModel {
    /// Load both files with `(active, inactive)` timeouts in seconds.
    ///
    /// `start_time` is the absolute instant the reference timestamps are
    /// relative to; the candidate keeps its exporter times.
    pub fn new(
        candidate: impl AsRef<Path>,
        reference: impl AsRef<Path>,
        timeouts: (u64, u64),
        start_time: Option<TimestampMs>,
    ) -> Result<Self, ModelError> {
        let settings = ModelSettings {
            active_timeout: timeouts.0,
            inactive_timeout: timeouts.1,
            start_time,
            ..ModelSettings::default()
        };
        Self::with_settings(candidate, reference, &settings)
    }

    pub fn with_settings(
        candidate: impl AsRef<Path>,
        reference: impl AsRef<Path>,
        settings: &ModelSettings,
    ) -> Result<Self, ModelError> {
        settings.check()?;
        let timeouts = Timeouts::from_secs(settings.active_timeout, settings.inactive_timeout);
        let (cand_offset, ref_offset) = offsets(settings);

        let candidate = Dataset::load(
            DatasetRole::Candidate,
            candidate.as_ref(),
            cand_offset,
            timeouts,
        )?;
        let reference = Dataset::load(
            DatasetRole::Reference,
            reference.as_ref(),
            ref_offset,
            timeouts,
        )?;

        Ok(StatisticalModel {
            candidate,
            reference,
            settings: *settings,
        })
    }

    /// Build from in-memory records.
    pub fn from_records(
        candidate: Vec<FlowRecord>,
        reference: Vec<FlowRecord>,
        settings: &ModelSettings,
    ) -> Result<Self, ModelError> {
        settings.check()?;
        let timeouts = Timeouts::from_secs(settings.active_timeout, settings.inactive_timeout);
        let (cand_offset, ref_offset) = offsets(settings);

        Ok(StatisticalModel {
            candidate: Dataset::from_records(
                DatasetRole::Candidate,
                candidate,
                cand_offset,
                timeouts,
            )?,
            reference: Dataset::from_records(
                DatasetRole::Reference,
                reference,
                ref_offset,
                timeouts,
            )?,
            settings: *settings,
        })
    }

    pub fn candidate(&self) -> &Dataset {
        &self.candidate
    }

    pub fn reference(&self) -> &Dataset {
        &self.reference
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Evaluate `rules` in order.
    ///
    /// Every rule is checked before any is evaluated, so a malformed rule
    /// anywhere in the list yields no report.
    pub fn validate(&self, rules: &[Rule]) -> Result<StatisticalReport, ModelError> {
        for (index, rule) in rules.iter().enumerate() {
            if let Some(metric) = rule.duplicate_metric() {
                return Err(ModelError::rule(index, rule, RuleError::DuplicateMetric(metric)));
            }
        }

        let mut report = StatisticalReport::new();
        for (index, rule) in rules.iter().enumerate() {
            let segment = rule.segment.as_ref();
            for metric in &rule.metrics {
                let value = self.candidate.aggregate(metric.key(), segment);
                let reference = self.reference.aggregate(metric.key(), segment);
                let outcome = TestOutcome::new(*metric, rule.segment.clone(), value, reference);
                debug!(
                    event = event_names::OUTCOME_COMPUTED,
                    stage = %Stage::Evaluate,
                    metric = %metric.key(),
                    value,
                    reference,
                    diff = outcome.diff,
                    tolerance = metric.tolerance(),
                    passed = outcome.is_passing(),
                    "Computed outcome"
                );
                report.add_test(outcome);
            }
            debug!(
                event = event_names::RULE_EVALUATED,
                stage = %Stage::Evaluate,
                rule = %rule_label(index, rule.name.as_deref()),
                metrics = rule.metrics.len(),
                "Evaluated rule"
            );
        }

        info!(
            event = event_names::VALIDATE_FINISHED,
            stage = %Stage::Evaluate,
            rules = rules.len(),
            tests = report.len(),
            failed = report.get_failed().len(),
            passed = report.is_passing(),
            "Validation finished"
        );
        Ok(report)
    }
}

fn offsets(settings: &ModelSettings) -> (Option<TimestampMs>, Option<TimestampMs>) {
    match settings.offset_scope {
        OffsetScope::Both => (settings.start_time, settings.start_time),
        OffsetScope::Reference => (None, settings.start_time),
    }
}

impl TryFrom<&RuleSpec> for Rule {
    type Error = RuleError;

    fn try_from(spec: &RuleSpec) -> Result<Self, Self::Error> {
        let metrics = spec
            .metrics
            .iter()
            .map(|m| Metric::new(m.metric.into(), m.tolerance))
            .collect::<Result<Vec<_>, _>>()?;

        let segment = match &spec.segment {
            None => None,
            Some(SegmentSpec::Subnet {
                source,
                dest,
                bidir,
            }) => Some(Segment::Subnet(SubnetSegment::new(
                source.as_deref(),
                dest.as_deref(),
                *bidir,
            )?)),
            Some(SegmentSpec::Time { start, end }) => {
                let resolve = |bound: &Option<ft_config::TimestampSpec>| {
                    bound
                        .as_ref()
                        .map(|b| b.resolve())
                        .transpose()
                        .map_err(|e| SegmentError::InvalidTime(e.to_string()))
                };
                Some(Segment::Time(TimeSegment::new(resolve(start)?, resolve(end)?)))
            }
        };

        let rule = Rule::new(metrics, segment);
        Ok(match &spec.name {
            Some(name) => rule.named(name.as_str()),
            None => rule,
        })
    }
}

/// Convert every rule of a rule file.
pub fn rules_from_file(file: &RuleFile) -> Result<Vec<Rule>, ModelError> {
    file.rules
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            Rule::try_from(spec).map_err(|source| ModelError::Rule {
                index,
                rule: rule_label(index, spec.name.as_deref()),
                source,
            })
        })
        .collect()
}
