//! Statistical report: the outcomes of one `validate` call.
//!
//! Text lines look like:
//! ```text
//! 192.168.187.0/24 <-> 212.24.128.0/24	BYTES	0.1000/0.0500	(900/1000)
//! ```
//! Failing lines are red when colored and prefixed with `FAIL` otherwise.

use serde::Serialize;
use std::fmt::Write as _;

use crate::model::{MetricType, Segment, TestOutcome};

const ERR_CLR: &str = "\x1b[31m";
const RST_CLR: &str = "\x1b[0m";

/// Ordered collection of test outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticalReport {
    tests: Vec<TestOutcome>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    total: usize,
    failed: usize,
    tests: Vec<JsonOutcome<'a>>,
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    #[serde(flatten)]
    outcome: &'a TestOutcome,
    segment_label: Option<String>,
    passed: bool,
}

impl StatisticalReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_test(&mut self, outcome: TestOutcome) {
        self.tests.push(outcome);
    }

    /// True iff every outcome passes (vacuously true when empty).
    pub fn is_passing(&self) -> bool {
        self.tests.iter().all(TestOutcome::is_passing)
    }

    /// Failing outcomes in insertion order.
    pub fn get_failed(&self) -> Vec<&TestOutcome> {
        self.tests.iter().filter(|t| !t.is_passing()).collect()
    }

    /// First outcome for `metric` under exactly `segment`.
    ///
    /// `None` as the segment matches only outcomes evaluated without one.
    pub fn get_test(&self, metric: MetricType, segment: Option<&Segment>) -> Option<&TestOutcome> {
        self.tests
            .iter()
            .find(|t| t.metric.key() == metric && t.segment.as_ref() == segment)
    }

    pub fn tests(&self) -> &[TestOutcome] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Print every outcome to stdout, colored when stdout is a terminal.
    pub fn print_results(&self) {
        use std::io::IsTerminal;
        println!();
        print!("{}", self.render_text(std::io::stdout().is_terminal()));
    }

    /// One line per outcome, each terminated by a newline.
    pub fn render_text(&self, use_color: bool) -> String {
        let mut out = String::new();
        for test in &self.tests {
            let failing = !test.is_passing();
            let mut line = String::new();
            if let Some(segment) = &test.segment {
                let _ = write!(line, "{}\t", segment);
            }
            let _ = write!(
                line,
                "{}\t{:.4}/{:.4}\t({}/{})",
                test.metric.key(),
                test.diff,
                test.metric.tolerance(),
                test.value,
                test.reference
            );

            match (failing, use_color) {
                (true, true) => {
                    let _ = writeln!(out, "{}{}{}", ERR_CLR, line, RST_CLR);
                }
                (true, false) => {
                    let _ = writeln!(out, "FAIL\t{}", line);
                }
                (false, _) => {
                    let _ = writeln!(out, "{}", line);
                }
            }
        }
        out
    }

    /// Markdown table with a status column.
    pub fn render_markdown(&self) -> String {
        let mut out = String::from("| Status | Segment | Metric | Difference | Tolerance | Candidate | Reference |\n");
        out.push_str("|---|---|---|---|---|---|---|\n");
        for test in &self.tests {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.4} | {:.4} | {} | {} |",
                if test.is_passing() { "PASS" } else { "FAIL" },
                test.segment
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |s| s.to_string()),
                test.metric.key(),
                test.diff,
                test.metric.tolerance(),
                test.value,
                test.reference
            );
        }
        out
    }

    /// `N tests, M failed: PASS|FAIL`
    pub fn render_summary(&self) -> String {
        format!(
            "{} tests, {} failed: {}",
            self.len(),
            self.get_failed().len(),
            if self.is_passing() { "PASS" } else { "FAIL" }
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let report = JsonReport {
            passed: self.is_passing(),
            total: self.len(),
            failed: self.get_failed().len(),
            tests: self
                .tests
                .iter()
                .map(|t| JsonOutcome {
                    outcome: t,
                    segment_label: t.segment.as_ref().map(|s| s.to_string()),
                    passed: t.is_passing(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metric, SubnetSegment, TimeSegment};

    fn outcome(kind: MetricType, tol: f64, segment: Option<Segment>, value: u64, reference: u64) -> TestOutcome {
        TestOutcome::new(Metric::new(kind, tol).unwrap(), segment, value, reference)
    }

    fn subnet() -> Segment {
        SubnetSegment::new(Some("192.168.187.0/24"), Some("212.24.128.0/24"), true)
            .unwrap()
            .into()
    }

    #[test]
    fn test_empty_report_passes() {
        let report = StatisticalReport::new();
        assert!(report.is_passing());
        assert!(report.get_failed().is_empty());
        assert_eq!(report.render_summary(), "0 tests, 0 failed: PASS");
    }

    #[test]
    fn test_get_failed_keeps_order() {
        let mut report = StatisticalReport::new();
        report.add_test(outcome(MetricType::Bytes, 0.0, None, 1, 2));
        report.add_test(outcome(MetricType::Packets, 0.0, None, 2, 2));
        report.add_test(outcome(MetricType::Flows, 0.0, None, 3, 2));

        let failed = report.get_failed();
        assert!(!report.is_passing());
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].metric.key(), MetricType::Bytes);
        assert_eq!(failed[1].metric.key(), MetricType::Flows);
    }

    #[test]
    fn test_get_test_segment_must_match_exactly() {
        let mut report = StatisticalReport::new();
        report.add_test(outcome(MetricType::Bytes, 0.0, Some(subnet()), 5, 5));
        report.add_test(outcome(MetricType::Bytes, 0.0, None, 7, 7));

        assert_eq!(report.get_test(MetricType::Bytes, None).unwrap().value, 7);
        assert_eq!(
            report.get_test(MetricType::Bytes, Some(&subnet())).unwrap().value,
            5
        );
        assert!(report.get_test(MetricType::Packets, None).is_none());

        let time: Segment = TimeSegment::new(Some(0), None).into();
        assert!(report.get_test(MetricType::Bytes, Some(&time)).is_none());
    }

    #[test]
    fn test_get_test_returns_first_match() {
        let mut report = StatisticalReport::new();
        report.add_test(outcome(MetricType::Flows, 0.0, None, 1, 1));
        report.add_test(outcome(MetricType::Flows, 0.5, None, 2, 2));
        assert_eq!(report.get_test(MetricType::Flows, None).unwrap().value, 1);
    }

    #[test]
    fn test_render_text_lines() {
        let mut report = StatisticalReport::new();
        report.add_test(outcome(MetricType::Bytes, 0.05, Some(subnet()), 900, 1000));
        report.add_test(outcome(MetricType::Packets, 0.0, None, 10, 10));

        let plain = report.render_text(false);
        let lines: Vec<&str> = plain.lines().collect();
        assert_eq!(
            lines[0],
            "FAIL\t192.168.187.0/24 <-> 212.24.128.0/24\tBYTES\t0.1000/0.0500\t(900/1000)"
        );
        assert_eq!(lines[1], "PACKETS\t0.0000/0.0000\t(10/10)");

        let colored = report.render_text(true);
        assert!(colored.starts_with("\x1b[31m192.168.187.0/24"));
        assert!(colored.lines().next().unwrap().ends_with("\x1b[0m"));
        assert!(!colored.lines().nth(1).unwrap().contains('\x1b'));
    }

    #[test]
    fn test_render_time_segment() {
        let mut report = StatisticalReport::new();
        let window: Segment = TimeSegment::new(Some(1_678_312_280_000), None).into();
        report.add_test(outcome(MetricType::Flows, 0.0, Some(window), 3, 3));
        assert_eq!(
            report.render_text(false),
            "2023-03-08T21:51:20.000Z -> ANY\tFLOWS\t0.0000/0.0000\t(3/3)\n"
        );
    }

    #[test]
    fn test_render_markdown_and_summary() {
        let mut report = StatisticalReport::new();
        report.add_test(outcome(MetricType::Bytes, 0.05, Some(subnet()), 900, 1000));
        report.add_test(outcome(MetricType::Flows, 0.0, None, 4, 4));

        let md = report.render_markdown();
        assert!(md.contains("| FAIL | 192.168.187.0/24 <-> 212.24.128.0/24 | BYTES | 0.1000 | 0.0500 | 900 | 1000 |"));
        assert!(md.contains("| PASS | - | FLOWS | 0.0000 | 0.0000 | 4 | 4 |"));
        assert_eq!(report.render_summary(), "2 tests, 1 failed: FAIL");
    }

    #[test]
    fn test_to_json() {
        let mut report = StatisticalReport::new();
        report.add_test(outcome(MetricType::Packets, 0.1, Some(subnet()), 95, 100));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["passed"], true);
        assert_eq!(json["total"], 1);
        let test = &json["tests"][0];
        assert_eq!(test["metric"]["key"], "PACKETS");
        assert_eq!(test["value"], 95);
        assert_eq!(test["segment"]["kind"], "subnet");
        assert_eq!(test["segment"]["source"], "192.168.187.0/24");
        assert_eq!(test["segment_label"], "192.168.187.0/24 <-> 212.24.128.0/24");
    }
}
