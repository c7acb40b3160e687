//! Tests for reading pytest's JUnit XML reports.

use std::fs;

use gradepod::execution::junit::{parse_document, parse_junit_xml, read_junit_report};
use uuid::Uuid;

const PYTEST_REPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites>
  <testsuite name="pytest" errors="1" failures="1" skipped="1" tests="5" time="0.412">
    <testcase classname="tests.test_answers" name="test_load_data" time="0.031" />
    <testcase classname="tests.test_answers" name="test_filter_signal" time="0.102">
      <failure message="AssertionError: assert 3 == 4">def test_filter_signal():
&gt;       assert filter_signal([1, 2, 3]) == 4
E       AssertionError: assert 3 == 4</failure>
    </testcase>
    <testcase classname="tests.test_answers" name="test_plot" time="0.010">
      <error message="fixture &apos;tmp_data&apos; not found"></error>
    </testcase>
    <testcase classname="tests.test_answers" name="test_optional" time="0.000">
      <skipped type="pytest.skip" message="not implemented" />
    </testcase>
    <testcase classname="tests.test_answers" name="test_report_parse" time="abc">
      <system-out><![CDATA[printing <stuff> & more]]></system-out>
    </testcase>
  </testsuite>
</testsuites>
"#;

#[test]
fn pytest_report_yields_every_testcase() {
    let tests = parse_junit_xml(PYTEST_REPORT).expect("parse report");

    let names: Vec<_> = tests.iter().map(|t| t.test_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "test_load_data",
            "test_filter_signal",
            "test_plot",
            "test_optional",
            "test_report_parse"
        ]
    );
}

#[test]
fn failures_carry_their_text() {
    let tests = parse_junit_xml(PYTEST_REPORT).expect("parse report");

    let failed = &tests[1];
    assert!(!failed.passed);
    assert_eq!(failed.duration_seconds, 0.102);
    let message = failed.error_message.as_deref().expect("failure text");
    assert!(message.contains("> "));
    assert!(message.contains("AssertionError: assert 3 == 4"));
}

#[test]
fn empty_error_falls_back_to_message_attribute() {
    let tests = parse_junit_xml(PYTEST_REPORT).expect("parse report");

    let errored = &tests[2];
    assert!(!errored.passed);
    assert_eq!(errored.error_message.as_deref(), Some("fixture 'tmp_data' not found"));
}

#[test]
fn skipped_and_plain_cases_pass() {
    let tests = parse_junit_xml(PYTEST_REPORT).expect("parse report");

    assert!(tests[0].passed);
    assert_eq!(tests[0].error_message, None);
    assert_eq!(tests[0].duration_seconds, 0.031);
    assert!(tests[3].passed);
    assert!(tests[4].passed);
    assert_eq!(tests[4].duration_seconds, 0.0);
}

#[test]
fn cdata_is_kept_verbatim() {
    let root = parse_document("<out><![CDATA[a < b & c]]></out>").expect("parse");
    assert_eq!(root.text(), "a < b & c");
}

#[test]
fn missing_name_defaults_to_unknown() {
    let tests = parse_junit_xml("<testsuite><testcase time=\"1.5\"/></testsuite>").expect("parse");
    assert_eq!(tests[0].test_name, "unknown");
    assert_eq!(tests[0].duration_seconds, 1.5);
}

#[test]
fn unreadable_reports_yield_no_tests() {
    let root = std::env::temp_dir().join(format!("gradepod-junit-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");

    assert!(read_junit_report(&root.join("test_report.xml")).is_empty());

    let broken = root.join("broken.xml");
    fs::write(&broken, "<testsuite><testcase name=\"x\">").expect("write broken report");
    assert!(read_junit_report(&broken).is_empty());

    let good = root.join("good.xml");
    fs::write(&good, PYTEST_REPORT).expect("write report");
    assert_eq!(read_junit_report(&good).len(), 5);

    let _ = fs::remove_dir_all(root);
}
