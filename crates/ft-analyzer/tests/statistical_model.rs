//! End-to-end tests of the statistical model over flow files on disk.
//!
//! Covers:
//! - Order independence and reconciliation of split flows
//! - Tolerance boundaries and the zero-reference policy
//! - Duplicate metric rejection
//! - Subnet isolation and time windows with a start-time offset
//! - Construction failures for missing or malformed files

use ft_analyzer::{
    rules_from_file, DatasetRole, InputError, LoadError, Metric, MetricType, ModelError, Rule,
    RuleError, Segment, StatisticalModel, SubnetSegment, TimeSegment,
};
use ft_config::{ModelSettings, OffsetScope, RuleFile};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const HEADER: &str =
    "SRC_IP,DST_IP,START_TIME,END_TIME,L3_PROTO,L4_PROTO,SRC_PORT,DST_PORT,PACKETS,BYTES";
const TIMEOUTS: (u64, u64) = (300, 30);
const START_TIME: i64 = 1_678_312_157_497;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    fn flows(&self, name: &str, rows: &[String]) -> PathBuf {
        let mut content = String::from(HEADER);
        content.push('\n');
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        self.raw(name, &content)
    }

    fn raw(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("write fixture");
        path
    }
}

fn row(src: &str, dst: &str, sport: u16, start: i64, end: i64, packets: u64, bytes: u64) -> String {
    format!("{src},{dst},{start},{end},4,6,{sport},443,{packets},{bytes}")
}

fn metric(kind: MetricType, tolerance: f64) -> Metric {
    Metric::new(kind, tolerance).expect("valid tolerance")
}

fn all_metrics(tolerance: f64) -> Vec<Metric> {
    MetricType::ALL.iter().map(|&k| metric(k, tolerance)).collect()
}

fn subnet(source: &str, dest: &str) -> Segment {
    SubnetSegment::new(Some(source), Some(dest), true)
        .expect("valid subnet")
        .into()
}

/// Two subnet pairs, 1000 bytes each in the reference.
fn two_pair_rows(pair_b_bytes: u64) -> Vec<String> {
    vec![
        row("192.168.187.10", "212.24.128.5", 40000, 0, 1_000, 10, 600),
        row("212.24.128.5", "192.168.187.10", 443, 10, 1_000, 8, 400),
        row("10.0.0.1", "10.1.0.1", 40001, 0, 1_000, 10, pair_b_bytes),
    ]
}

#[test]
fn test_identical_datasets_pass_with_zero_tolerance() {
    let fx = Fixture::new();
    let rows = two_pair_rows(1_000);
    let cand = fx.flows("cand.csv", &rows);
    let refr = fx.flows("ref.csv", &rows);

    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();
    let report = model.validate(&[Rule::new(all_metrics(0.0), None)]).unwrap();

    assert!(report.is_passing());
    assert_eq!(report.len(), 3);
    for kind in MetricType::ALL {
        let test = report.get_test(kind, None).unwrap();
        assert_eq!(test.value, test.reference);
        assert_eq!(test.diff, 0.0);
    }
    assert_eq!(report.get_test(MetricType::Bytes, None).unwrap().value, 2_000);
}

#[test]
fn test_shuffled_rows_give_same_outcome() {
    let fx = Fixture::new();
    let rows = vec![
        row("10.0.0.1", "10.1.0.1", 1000, 0, 300_000, 10, 1_000),
        row("10.0.0.1", "10.1.0.1", 1000, 300_000, 450_000, 5, 500),
        row("10.0.0.2", "10.1.0.1", 1001, 20, 40, 1, 60),
        row("10.0.0.3", "10.1.0.2", 1002, 100, 900, 3, 180),
    ];
    let mut shuffled = rows.clone();
    shuffled.reverse();
    shuffled.swap(0, 2);

    let refr = fx.flows("ref.csv", &rows);
    let cand = fx.flows("cand.csv", &shuffled);

    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();
    let report = model.validate(&[Rule::new(all_metrics(0.0), None)]).unwrap();

    assert!(report.is_passing());
    assert_eq!(report.get_test(MetricType::Flows, None).unwrap().value, 3);
}

#[test]
fn test_split_flow_reconciles_to_single_reference_flow() {
    let fx = Fixture::new();
    let refr = fx.flows(
        "ref.csv",
        &[row("192.168.187.10", "212.24.128.5", 40000, 0, 420_000, 30, 3_000)],
    );
    let cand = fx.flows(
        "cand.csv",
        &[
            row("192.168.187.10", "212.24.128.5", 40000, 0, 300_000, 20, 2_000),
            row("192.168.187.10", "212.24.128.5", 40000, 300_004, 420_000, 10, 1_000),
        ],
    );

    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();
    assert_eq!(model.candidate().raw_len(), 2);
    assert_eq!(model.candidate().flows().len(), 1);
    assert_eq!(model.candidate().stats().merges, 1);

    let report = model.validate(&[Rule::new(all_metrics(0.0), None)]).unwrap();
    assert!(report.is_passing(), "{}", report.render_text(false));
}

#[test]
fn test_short_flows_with_gap_are_not_merged() {
    let fx = Fixture::new();
    let refr = fx.flows(
        "ref.csv",
        &[row("10.0.0.1", "10.1.0.1", 1000, 0, 100_000, 30, 3_000)],
    );
    let cand = fx.flows(
        "cand.csv",
        &[
            row("10.0.0.1", "10.1.0.1", 1000, 0, 10_000, 20, 2_000),
            row("10.0.0.1", "10.1.0.1", 1000, 10_001, 100_000, 10, 1_000),
        ],
    );

    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();
    let report = model
        .validate(&[Rule::new(vec![metric(MetricType::Flows, 0.0)], None)])
        .unwrap();
    let flows = report.get_test(MetricType::Flows, None).unwrap();
    assert_eq!((flows.value, flows.reference), (2, 1));
    assert!(!report.is_passing());
}

#[test]
fn test_tolerance_boundary() {
    let fx = Fixture::new();
    let refr = fx.flows("ref.csv", &[row("10.0.0.1", "10.1.0.1", 1, 0, 10, 10, 1_000)]);
    let cand = fx.flows("cand.csv", &[row("10.0.0.1", "10.1.0.1", 1, 0, 10, 10, 900)]);
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();

    let below = model
        .validate(&[Rule::new(vec![metric(MetricType::Bytes, 0.09)], None)])
        .unwrap();
    assert!(!below.is_passing());

    let at = model
        .validate(&[Rule::new(vec![metric(MetricType::Bytes, 0.1)], None)])
        .unwrap();
    assert!(at.is_passing());

    let above = model
        .validate(&[Rule::new(vec![metric(MetricType::Bytes, 0.11)], None)])
        .unwrap();
    assert!(above.is_passing());
}

#[test]
fn test_duplicate_metric_raises_and_yields_no_report() {
    let fx = Fixture::new();
    let rows = two_pair_rows(1_000);
    let cand = fx.flows("cand.csv", &rows);
    let refr = fx.flows("ref.csv", &rows);
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();

    let rule = Rule::new(
        vec![metric(MetricType::Packets, 0.0), metric(MetricType::Packets, 0.5)],
        None,
    );
    let err = model.validate(&[rule]).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Rule {
            index: 0,
            source: RuleError::DuplicateMetric(MetricType::Packets),
            ..
        }
    ));
}

#[test]
fn test_missing_bytes_in_one_subnet_pair() {
    let fx = Fixture::new();
    let refr = fx.flows("ref.csv", &two_pair_rows(1_000));
    let cand = fx.flows("cand.csv", &two_pair_rows(800));
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();

    let unscoped = model
        .validate(&[Rule::new(vec![metric(MetricType::Bytes, 0.05)], None)])
        .unwrap();
    assert!(!unscoped.is_passing());
    let bytes = unscoped.get_test(MetricType::Bytes, None).unwrap();
    assert_eq!((bytes.value, bytes.reference), (1_800, 2_000));

    let unaffected = subnet("192.168.187.0/24", "212.24.128.0/24");
    let scoped = model
        .validate(&[Rule::new(
            vec![metric(MetricType::Bytes, 0.05)],
            Some(unaffected.clone()),
        )])
        .unwrap();
    assert!(scoped.is_passing());
    let bytes = scoped
        .get_test(MetricType::Bytes, Some(&unaffected))
        .unwrap();
    assert_eq!((bytes.value, bytes.reference), (1_000, 1_000));

    let affected = subnet("10.0.0.0/24", "10.1.0.0/24");
    let report = model
        .validate(&[Rule::new(all_metrics(0.05), Some(affected.clone()))])
        .unwrap();
    assert!(!report.is_passing());
    assert_eq!(report.get_failed().len(), 1);
    assert_eq!(report.get_failed()[0].metric.key(), MetricType::Bytes);
}

#[test]
fn test_directional_subnet_segment() {
    let fx = Fixture::new();
    let rows = two_pair_rows(1_000);
    let cand = fx.flows("cand.csv", &rows);
    let refr = fx.flows("ref.csv", &rows);
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();

    let forward: Segment = SubnetSegment::new(Some("192.168.187.0/24"), Some("212.24.128.0/24"), false)
        .unwrap()
        .into();
    let both = subnet("192.168.187.0/24", "212.24.128.0/24");
    let report = model
        .validate(&[
            Rule::new(vec![metric(MetricType::Flows, 0.0)], Some(forward.clone())),
            Rule::new(vec![metric(MetricType::Flows, 0.0)], Some(both.clone())),
        ])
        .unwrap();

    assert_eq!(report.get_test(MetricType::Flows, Some(&forward)).unwrap().value, 1);
    assert_eq!(report.get_test(MetricType::Flows, Some(&both)).unwrap().value, 2);
}

#[test]
fn test_time_segment_with_start_time_offset() {
    let fx = Fixture::new();
    let rows = |offset: i64| {
        vec![
            row("10.0.0.1", "10.1.0.1", 1, offset, offset + 1_000, 1, 100),
            row("10.0.0.1", "10.1.0.1", 2, offset + 5_000, offset + 6_000, 2, 200),
            row("10.0.0.1", "10.1.0.1", 3, offset + 10_000, offset + 20_000, 4, 400),
        ]
    };
    // Exporter output is absolute, the generated reference relative.
    let cand = fx.flows("cand.csv", &rows(START_TIME));
    let refr = fx.flows("ref.csv", &rows(0));
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, Some(START_TIME)).unwrap();

    let exact: Segment = TimeSegment::new(Some(START_TIME + 5_000), Some(START_TIME + 6_000)).into();
    let late_start: Segment = TimeSegment::new(Some(START_TIME + 5_001), Some(START_TIME + 6_000)).into();
    let early_end: Segment = TimeSegment::new(Some(START_TIME + 5_000), Some(START_TIME + 5_999)).into();
    let open_end: Segment = TimeSegment::new(Some(START_TIME + 5_000), None).into();

    let rules: Vec<Rule> = [&exact, &late_start, &early_end, &open_end]
        .into_iter()
        .map(|seg| Rule::new(vec![metric(MetricType::Packets, 0.0)], Some(seg.clone())))
        .collect();
    let report = model.validate(&rules).unwrap();

    let packets = |seg: &Segment| report.get_test(MetricType::Packets, Some(seg)).unwrap().value;
    assert_eq!(packets(&exact), 2);
    assert_eq!(packets(&late_start), 0);
    assert_eq!(packets(&early_end), 0);
    assert_eq!(packets(&open_end), 6);
    assert!(report.is_passing());
}

#[test]
fn test_offset_applied_to_reference_only() {
    let fx = Fixture::new();
    let refr = fx.flows("ref.csv", &[row("10.0.0.1", "10.1.0.1", 1, 5_000, 6_000, 2, 200)]);
    let cand = fx.flows(
        "cand.csv",
        &[row("10.0.0.1", "10.1.0.1", 1, START_TIME + 5_000, START_TIME + 6_000, 2, 200)],
    );
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, Some(START_TIME)).unwrap();
    assert_eq!(model.candidate().flows()[0].start, START_TIME + 5_000);
    assert_eq!(model.reference().flows()[0].start, START_TIME + 5_000);

    let window: Segment = TimeSegment::new(Some(START_TIME), Some(START_TIME + 10_000)).into();
    let report = model
        .validate(&[Rule::new(all_metrics(0.0), Some(window.clone()))])
        .unwrap();
    assert!(report.is_passing(), "{}", report.render_text(false));
    assert_eq!(report.get_test(MetricType::Flows, Some(&window)).unwrap().value, 1);
}

#[test]
fn test_offset_on_both_datasets_when_requested() {
    let fx = Fixture::new();
    let rows = [row("10.0.0.1", "10.1.0.1", 1, 5_000, 6_000, 2, 200)];
    let cand = fx.flows("cand.csv", &rows);
    let refr = fx.flows("ref.csv", &rows);
    let settings = ModelSettings {
        start_time: Some(START_TIME),
        offset_scope: OffsetScope::Both,
        ..ModelSettings::default()
    };
    let model = StatisticalModel::with_settings(&cand, &refr, &settings).unwrap();

    let window: Segment = TimeSegment::new(Some(START_TIME), Some(START_TIME + 10_000)).into();
    let report = model
        .validate(&[Rule::new(all_metrics(0.0), Some(window.clone()))])
        .unwrap();
    assert!(report.is_passing());
    assert_eq!(report.get_test(MetricType::Packets, Some(&window)).unwrap().value, 2);
}

#[test]
fn test_zero_reference_policy() {
    let fx = Fixture::new();
    let refr = fx.flows("ref.csv", &[row("10.0.0.1", "10.1.0.1", 1, 0, 10, 1, 100)]);
    let cand = fx.flows(
        "cand.csv",
        &[
            row("10.0.0.1", "10.1.0.1", 1, 0, 10, 1, 100),
            row("172.16.0.1", "172.16.1.1", 1, 0, 10, 1, 100),
        ],
    );
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();

    let empty_both = subnet("192.0.2.0/24", "198.51.100.0/24");
    let empty_ref = subnet("172.16.0.0/24", "172.16.1.0/24");
    let report = model
        .validate(&[
            Rule::new(vec![metric(MetricType::Flows, 0.0)], Some(empty_both.clone())),
            Rule::new(vec![metric(MetricType::Flows, 0.99)], Some(empty_ref.clone())),
            Rule::new(vec![metric(MetricType::Bytes, 1.0)], Some(empty_ref.clone())),
        ])
        .unwrap();

    let both = report.get_test(MetricType::Flows, Some(&empty_both)).unwrap();
    assert_eq!(both.diff, 0.0);
    assert!(both.is_passing());

    let flows = report.get_test(MetricType::Flows, Some(&empty_ref)).unwrap();
    assert_eq!(flows.diff, 1.0);
    assert!(!flows.is_passing());

    assert!(report.get_test(MetricType::Bytes, Some(&empty_ref)).unwrap().is_passing());
}

#[test]
fn test_biflow_counters_are_summed() {
    let fx = Fixture::new();
    let header = "SRC_IP,DST_IP,START_TIME,END_TIME,L3_PROTO,L4_PROTO,SRC_PORT,DST_PORT,PACKETS,BYTES,PACKETS_REV,BYTES_REV";
    let cand = fx.raw(
        "cand.csv",
        &format!("{header}\n10.0.0.1,10.1.0.1,0,10,4,6,1,443,3,300,2,200\n"),
    );
    let refr = fx.flows(
        "ref.csv",
        &[
            row("10.0.0.1", "10.1.0.1", 1, 0, 10, 3, 300),
            row("10.1.0.1", "10.0.0.1", 443, 0, 10, 2, 200),
        ],
    );
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();
    let report = model
        .validate(&[Rule::new(
            vec![metric(MetricType::Packets, 0.0), metric(MetricType::Bytes, 0.0)],
            None,
        )])
        .unwrap();
    assert!(report.is_passing());
    assert_eq!(report.get_test(MetricType::Packets, None).unwrap().value, 5);
}

#[test]
fn test_subnet_membership_ignores_reverse_direction() {
    let fx = Fixture::new();
    let header = "SRC_IP,DST_IP,START_TIME,END_TIME,L3_PROTO,L4_PROTO,SRC_PORT,DST_PORT,PACKETS,BYTES,PACKETS_REV,BYTES_REV";
    let biflow = fx.raw(
        "biflow.csv",
        &format!("{header}\n10.0.0.1,10.1.0.1,0,10,4,6,1,443,3,300,2,200\n"),
    );
    let model = StatisticalModel::new(&biflow, &biflow, TIMEOUTS, None).unwrap();

    let forward: Segment = SubnetSegment::new(Some("10.0.0.0/24"), Some("10.1.0.0/24"), false)
        .unwrap()
        .into();
    let backward: Segment = SubnetSegment::new(Some("10.1.0.0/24"), Some("10.0.0.0/24"), false)
        .unwrap()
        .into();
    let both_ways: Segment = SubnetSegment::new(Some("10.1.0.0/24"), Some("10.0.0.0/24"), true)
        .unwrap()
        .into();

    let rules: Vec<Rule> = [("forward", &forward), ("backward", &backward), ("both ways", &both_ways)]
        .into_iter()
        .map(|(name, seg)| Rule::new(all_metrics(0.0), Some(seg.clone())).named(name))
        .collect();
    let report = model.validate(&rules).unwrap();
    let value = |metric, seg: &Segment| report.get_test(metric, Some(seg)).unwrap().value;

    // Exported A -> B: the reverse side does not make it a B -> A flow.
    assert_eq!(value(MetricType::Flows, &backward), 0);
    assert_eq!(value(MetricType::Packets, &backward), 0);
    assert_eq!(value(MetricType::Bytes, &backward), 0);

    // Once selected, the record counts with both directions.
    for seg in [&forward, &both_ways] {
        assert_eq!(value(MetricType::Flows, seg), 1);
        assert_eq!(value(MetricType::Packets, seg), 5);
        assert_eq!(value(MetricType::Bytes, seg), 500);
    }
    assert!(report.is_passing());
}

#[test]
fn test_tolerance_validation() {
    assert!(Metric::new(MetricType::Packets, -1.0).is_err());
    assert!(Metric::new(MetricType::Packets, 1.1).is_err());
    assert!(Metric::new(MetricType::Packets, 0.0).is_ok());
    assert!(Metric::new(MetricType::Packets, 1.0).is_ok());
}

#[test]
fn test_missing_candidate_file() {
    let fx = Fixture::new();
    let refr = fx.flows("ref.csv", &two_pair_rows(1_000));
    let err = StatisticalModel::new(fx.dir.path().join("absent.csv"), &refr, TIMEOUTS, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::Input {
            role: DatasetRole::Candidate,
            source: InputError::Load(LoadError::NotFound { .. })
        }
    ));
}

#[test]
fn test_malformed_reference_aborts_construction() {
    let fx = Fixture::new();
    let cand = fx.flows("cand.csv", &two_pair_rows(1_000));
    let refr = fx.raw(
        "ref.csv",
        &format!("{HEADER}\n10.0.0.1,10.1.0.1,0,10,4,6,1,443,many,100\n"),
    );
    let err = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap_err();
    match err {
        ModelError::Input {
            role: DatasetRole::Reference,
            source: InputError::Load(LoadError::Malformed { line, .. }),
        } => assert_eq!(line, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_reversed_timestamps_abort_construction() {
    let fx = Fixture::new();
    let cand = fx.flows("cand.csv", &[row("10.0.0.1", "10.1.0.1", 1, 50, 10, 1, 100)]);
    let refr = fx.flows("ref.csv", &two_pair_rows(1_000));
    let err = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Input {
            role: DatasetRole::Candidate,
            source: InputError::Reconcile(_)
        }
    ));
}

#[test]
fn test_rules_from_toml_file() {
    let fx = Fixture::new();
    let rows = two_pair_rows(1_000);
    let cand = fx.flows("cand.csv", &two_pair_rows(800));
    let refr = fx.flows("ref.csv", &rows);
    let rules_path = fx.raw(
        "rules.toml",
        r#"
[[rules]]
name = "all traffic"
metrics = [ { metric = "bytes", tolerance = 0.05 } ]

[[rules]]
metrics = [ { metric = "bytes", tolerance = 0.05 }, { metric = "flows", tolerance = 0.0 } ]
segment = { subnet = { source = "192.168.187.0/24", dest = "212.24.128.0/24", bidir = true } }
"#,
    );

    let file = RuleFile::from_file(&rules_path).unwrap();
    let rules = rules_from_file(&file).unwrap();
    let model = StatisticalModel::new(&cand, &refr, TIMEOUTS, None).unwrap();
    let report = model.validate(&rules).unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(report.get_failed().len(), 1);
    assert!(report.get_failed()[0].segment.is_none());
}
