//! End-to-end pipeline tests that stop short of the container boundary:
//! compile → generate (cached) → parse report → classify verdict.

use autograde::{
    classify, compile_spec, parse_report, ExecOutcome, GeneratorRegistry, Orchestrator,
    OrchestratorConfig, Status, TestStyle,
};
use pretty_assertions::assert_eq;

const COUNTER_SPEC: &str = r#"
type: oop
description: A simple counter
class:
  name: Counter
  methods:
    - name: init
    - name: increment
      returns: void
    - name: get
      returns: integer
tests:
  - name: startsAtZero
    setup:
      - action: create
        class: Counter
        var: c
    actions:
      - action: call
        var: c
        method: get
        expected: 0
  - name: incrementTwice
    setup:
      - action: create
        class: Counter
        var: c
    actions:
      - action: call
        var: c
        method: increment
        expected: null
      - action: call
        var: c
        method: increment
        expected: null
      - action: call
        var: c
        method: get
        expected: 2
"#;

#[test]
fn generated_harness_carries_ir_test_names_verbatim() {
    let ir = compile_spec(COUNTER_SPEC).unwrap();
    assert_eq!(ir.style(), TestStyle::Oop);

    let registry = GeneratorRegistry::with_builtins();
    let harness = registry.generate("python", &ir).unwrap();

    for name in ir.test_names() {
        assert!(
            harness.contains(&format!(": \"{}\",", name)),
            "report name table must carry '{}' verbatim",
            name
        );
    }
    // execution order follows IR order via the zero-padded method prefix
    let first = harness.find("test_0000_startsAtZero").unwrap();
    let second = harness.find("test_0001_incrementTwice").unwrap();
    assert!(first < second);
}

#[test]
fn orchestrator_serves_harnesses_from_cache_until_ir_changes() {
    let orchestrator = Orchestrator::new(OrchestratorConfig::default());
    orchestrator.store_problem("counter", COUNTER_SPEC).unwrap();

    let first = orchestrator.harness("counter", "python").unwrap();
    let second = orchestrator.harness("counter", "python").unwrap();
    assert_eq!(first, second);

    let changed = COUNTER_SPEC.replace("expected: 2", "expected: 3");
    let record = orchestrator.store_problem("counter", &changed).unwrap();
    assert_eq!(record.ir_version, 2);
    let third = orchestrator.harness("counter", "python").unwrap();
    assert_ne!(first, third);
}

#[test]
fn report_to_verdict_passing_run() {
    // what the harness writes for scenario: all cases green
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuite name="python-oop" tests="2" failures="0" errors="0" time="0.031">
<testcase classname="python-oop" name="startsAtZero" time="0.012"/>
<testcase classname="python-oop" name="incrementTwice" time="0.019"/>
</testsuite>"#;
    let report = parse_report(xml.as_bytes()).unwrap();
    let outcome = ExecOutcome {
        exit_code: Some(0),
        wall_time_s: 0.4,
        ..Default::default()
    };

    let verdict = classify(&outcome, Some(&report));
    assert_eq!(verdict.status, Status::Passed);
    assert_eq!(verdict.summary.tests, 2);
    assert_eq!(verdict.summary.failures, 0);
    assert!(verdict.first_failure.is_none());
}

#[test]
fn report_to_verdict_trailing_newline_failure() {
    // the standardIo scenario where the student omits the trailing newline
    let xml = r#"<testsuite name="python-standardIo" tests="1" failures="1" errors="0" time="0.2">
<testcase classname="python-standardIo" name="add" time="0.2">
<failure message="'5\n' != '5' : expected exact stdout match">Traceback ...</failure>
</testcase>
</testsuite>"#;
    let report = parse_report(xml.as_bytes()).unwrap();
    let outcome = ExecOutcome {
        exit_code: Some(1),
        wall_time_s: 0.3,
        ..Default::default()
    };

    let verdict = classify(&outcome, Some(&report));
    assert_eq!(verdict.status, Status::Failed);
    let failure = verdict.first_failure.unwrap();
    assert_eq!(failure.test, "add");
    assert!(failure.message.contains("exact stdout match"));
}

#[test]
fn report_to_verdict_per_case_timeout_reclassified() {
    let xml = r#"<testsuite name="python-function" tests="1" failures="1" errors="0" time="1.1">
<testcase classname="python-function" name="loops" time="1.0">
<failure message="timeout: case exceeded 1.0s">Traceback ...</failure>
</testcase>
</testsuite>"#;
    let report = parse_report(xml.as_bytes()).unwrap();
    let outcome = ExecOutcome {
        exit_code: Some(1),
        wall_time_s: 1.4,
        ..Default::default()
    };

    let verdict = classify(&outcome, Some(&report));
    assert_eq!(verdict.status, Status::Timeout);
}

#[test]
fn every_classification_lands_in_the_closed_status_set() {
    let passing = "<testsuite name=\"s\" tests=\"1\"><testcase name=\"a\"/></testsuite>";
    let report = parse_report(passing.as_bytes()).unwrap();

    let outcomes = [
        ExecOutcome::default(),
        ExecOutcome {
            host_timeout_fired: true,
            ..Default::default()
        },
        ExecOutcome {
            cancelled: true,
            ..Default::default()
        },
        ExecOutcome {
            exit_code: Some(137),
            oom_indicated: true,
            ..Default::default()
        },
    ];

    for outcome in &outcomes {
        for report in [None, Some(&report)] {
            let verdict = classify(outcome, report);
            assert!(matches!(
                verdict.status,
                Status::Passed
                    | Status::Failed
                    | Status::Error
                    | Status::Timeout
                    | Status::Oom
                    | Status::SandboxError
                    | Status::Unknown
            ));
            assert!(!verdict.title.is_empty());
            assert!(!verdict.message.is_empty());
        }
    }
}

#[tokio::test]
async fn unknown_problem_and_ambiguous_runtime_are_input_errors() {
    let orchestrator = Orchestrator::new(OrchestratorConfig::default());

    let err = orchestrator
        .run_submission("ghost", "print(1)", Default::default())
        .await
        .unwrap_err();
    assert!(err.is_input_error());

    orchestrator.store_problem("counter", COUNTER_SPEC).unwrap();
    let err = orchestrator
        .run_submission(
            "counter",
            "print(1)",
            autograde::SubmitOptions {
                runtime: Some("cobol74".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_input_error());
}
