//! Tests for cohort aggregation and export.

use std::{fs, path::PathBuf};

use gradepod::{
    aggregate::{Aggregator, CohortStatistics, GradesSummary, load_grades_from_dir, sort_grades},
    constants::{GRADES_CSV_FILENAME, GRADES_SUMMARY_FILENAME},
    grade::{GradeResult, SectionGrade},
};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("gradepod-aggregate-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn grade(student: &str, repo: Option<&str>, total: f64, passed: bool) -> GradeResult {
    GradeResult::builder()
        .student_id(student)
        .sections(vec![
            SectionGrade::builder()
                .section_name("Data Loading")
                .points_earned(total.min(10.0))
                .max_points(10.0)
                .feedback("ok")
                .build(),
            SectionGrade::builder()
                .section_name("Plots")
                .points_earned((total - 10.0).max(0.0))
                .max_points(10.0)
                .feedback("ok")
                .build(),
        ])
        .code_execution_passed(passed)
        .total_score(total)
        .max_score(20.0)
        .overall_feedback(format!("Feedback for {student}"))
        .maybe_github_repo(repo.map(String::from))
        .build()
}

#[test]
fn sort_orders_by_repository_then_student() {
    let mut grades = vec![
        grade("zoe", Some("org/b"), 10.0, true),
        grade("bob", None, 10.0, true),
        grade("amy", Some("org/b"), 10.0, true),
        grade("ann", None, 10.0, true),
        grade("cat", Some("org/a"), 10.0, true),
    ];
    sort_grades(&mut grades);

    let order: Vec<_> = grades.iter().map(|g| g.student_id.as_str()).collect();
    assert_eq!(order, vec!["ann", "bob", "cat", "amy", "zoe"]);
}

#[test]
fn statistics_cover_the_cohort() {
    let grades = vec![
        grade("a", None, 20.0, true),
        grade("b", None, 10.0, false),
        grade("c", None, 15.0, true),
        grade("d", None, 5.0, false),
    ];
    let stats = CohortStatistics::compute(&grades).expect("stats");

    assert_eq!(stats.average_score, 12.5);
    assert_eq!(stats.max_possible, 20.0);
    assert_eq!(stats.highest_score, 20.0);
    assert_eq!(stats.lowest_score, 5.0);
    assert_eq!(stats.tests_passed_count, 2);
    assert_eq!(stats.tests_passed_percent, 50.0);

    assert!(CohortStatistics::compute(&[]).is_none());
}

#[test]
fn finalize_writes_records_summary_and_csv() {
    let root = temp_root();
    let out = root.join("grades");

    let mut aggregator = Aggregator::new(&out);
    aggregator.add(grade("bob", None, 12.0, false));
    aggregator.add(grade("ada", None, 18.0, true));
    let saved = aggregator.finalize().expect("finalize");

    assert_eq!(saved.records, vec![out.join("ada.json"), out.join("bob.json")]);
    assert_eq!(saved.summary, out.join(GRADES_SUMMARY_FILENAME));
    assert_eq!(saved.csv, Some(out.join(GRADES_CSV_FILENAME)));

    let summary: GradesSummary =
        serde_json::from_str(&fs::read_to_string(&saved.summary).expect("read summary"))
            .expect("parse summary");
    assert_eq!(summary.total_students, 2);
    assert_eq!(summary.grades[0].student_id, "ada");
    assert_eq!(summary.statistics.expect("stats").average_score, 15.0);
    assert!(summary.run_id.is_some());

    let mut reader = csv::Reader::from_path(out.join(GRADES_CSV_FILENAME)).expect("open csv");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "student_id",
            "total_score",
            "max_score",
            "percentage",
            "tests_passed",
            "github_repo",
            "Data Loading",
            "Plots",
            "overall_feedback",
        ]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "ada");
    assert_eq!(&rows[0][3], "90.0%");
    assert_eq!(&rows[0][4], "Yes");
    assert_eq!(&rows[0][6], "10/10");
    assert_eq!(&rows[0][7], "8/10");
    assert_eq!(&rows[1][4], "No");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn empty_cohort_writes_empty_statistics_and_no_csv() {
    let root = temp_root();
    let out = root.join("grades");

    let saved = Aggregator::new(&out).finalize().expect("finalize");
    assert!(saved.csv.is_none());
    assert!(saved.records.is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&saved.summary).expect("read summary"))
            .expect("parse summary");
    assert_eq!(json["total_students"], 0);
    assert_eq!(json["statistics"], serde_json::json!({}));
    assert_eq!(json["grades"], serde_json::json!([]));

    let summary: GradesSummary = serde_json::from_value(json).expect("typed summary");
    assert!(summary.statistics.is_none());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn saved_grades_load_from_summary() {
    let root = temp_root();

    let mut aggregator = Aggregator::new(&root);
    aggregator.add(grade("cy", Some("org/z"), 9.0, true));
    aggregator.add(grade("al", Some("org/z"), 11.0, true));
    aggregator.finalize().expect("finalize");

    let loaded = load_grades_from_dir(&root).expect("load");
    assert_eq!(loaded, aggregator.grades());
    assert_eq!(loaded[0].student_id, "al");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn records_are_read_when_summary_is_missing() {
    let root = temp_root();

    let mut aggregator = Aggregator::new(&root);
    aggregator.add(grade("bo", None, 7.0, false));
    aggregator.add(grade("al", None, 11.0, true));
    aggregator.finalize().expect("finalize");
    fs::remove_file(root.join(GRADES_SUMMARY_FILENAME)).expect("remove summary");
    fs::write(root.join("notes.json"), "not a grade").expect("write junk");

    let loaded = load_grades_from_dir(&root).expect("load");
    let ids: Vec<_> = loaded.iter().map(|g| g.student_id.as_str()).collect();
    assert_eq!(ids, vec!["al", "bo"]);

    let _ = fs::remove_dir_all(root);
}
