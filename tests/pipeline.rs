//! End-to-end grading of submissions with stand-in test and LLM backends.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use gradepod::{
    aggregate::Aggregator,
    constants::{GRADE_OUTPUT_FILENAME, SECTION_NOT_GRADED},
    error::SemanticGraderFault,
    execution::{ExecutionAdapter, ExecutionResult},
    grade::{
        ExtraCreditPolicy, GradeResult, GradingMode, Pending,
        fallback::{
            FAILING_FEEDBACK, FAILING_SHARE, FALLBACK_OVERALL_FEEDBACK, PASSING_FEEDBACK,
            PASSING_SHARE,
        },
    },
    config::{CliOverrides, FileConfig, GraderConfig},
    pipeline::{Pipeline, semantic_grader},
    rubric::{Rubric, parse_rubric},
    semantic::{ImageDescription, JudgmentRequest, RawJudgment, SemanticGrader},
    submission::{Submission, find_submissions},
};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("gradepod-pipeline-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn rubric() -> Rubric {
    parse_rubric(
        "# HW5 (15 pts)\n\n## Setup (5 pts)\n\nInstall the dependencies and import the \
         data.\n\n## Data Loading (10 pts)\n\nRead every recording into a dataframe.\n\n## Bonus \
         Plot (5 pts)\n\nAny extra figure you find interesting.\n",
        "hw5",
    )
    .expect("parse rubric")
}

/// Creates `<root>/<name>` with the given files.
fn submission(root: &Path, name: &str, files: &[(&str, &str)]) -> Submission {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("create submission");
    for (file, body) in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, body).expect("write submission file");
    }
    Submission::load(&dir).expect("load submission")
}

fn passed() -> ExecutionResult {
    ExecutionResult {
        success:          true,
        exit_code:        0,
        timeout_exceeded: false,
        setup_log:        "Local environment used".into(),
        test_log:         "tests/test_answers.py::test_load PASSED".into(),
        tests:            Vec::new(),
    }
}

/// Returns the same execution result for every submission.
struct CannedRunner(ExecutionResult);

impl ExecutionAdapter for CannedRunner {
    async fn run(&self, _submission: &Path) -> ExecutionResult {
        self.0.clone()
    }
}

/// Replies with a fixed response text, or times out.
struct ScriptedGrader {
    /// Response text; `None` simulates a timeout.
    reply:       Option<&'static str>,
    /// Number of judge calls.
    judged:      AtomicUsize,
    /// Images seen by the last judge call.
    images_seen: AtomicUsize,
}

impl ScriptedGrader {
    fn replying(reply: &'static str) -> Self {
        Self {
            reply:       Some(reply),
            judged:      AtomicUsize::new(0),
            images_seen: AtomicUsize::new(0),
        }
    }

    fn timing_out() -> Self {
        Self {
            reply:       None,
            judged:      AtomicUsize::new(0),
            images_seen: AtomicUsize::new(0),
        }
    }
}

impl SemanticGrader for ScriptedGrader {
    async fn judge(
        &self,
        request: &JudgmentRequest<'_>,
    ) -> Result<RawJudgment, SemanticGraderFault> {
        self.judged.fetch_add(1, Ordering::SeqCst);
        self.images_seen
            .store(request.images.len(), Ordering::SeqCst);

        match self.reply {
            Some(text) => Ok(RawJudgment::from_response(text)?),
            None => Err(SemanticGraderFault::Timeout {
                model: "scripted".into(),
                secs:  1,
            }),
        }
    }

    async fn describe_image(&self, path: &Path, caption: &str) -> ImageDescription {
        ImageDescription {
            filename:    path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            caption:     caption.to_string(),
            description: "A line plot of the filtered signal.".into(),
        }
    }
}

fn saved_grade(submission: &Submission) -> GradeResult {
    let text = fs::read_to_string(submission.path.join(GRADE_OUTPUT_FILENAME))
        .expect("read grade.json");
    serde_json::from_str(&text).expect("parse grade.json")
}

#[tokio::test]
async fn timeout_without_grader_gives_thirty_percent() {
    let root = temp_root();
    let rubric = rubric();
    let sub = submission(&root, "ada", &[("answers.py", "def load(): pass\n")]);
    let runner = CannedRunner(ExecutionResult::timed_out(120));

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .maybe_grader(None::<&ScriptedGrader>)
        .build();
    let grade = pipeline.grade_submission(&sub).await;

    assert_eq!(grade.grading_mode, GradingMode::Fallback);
    assert!(!grade.code_execution_passed);
    assert_eq!(grade.max_score, 15.0);
    for (section, max) in grade.sections.iter().zip([5.0, 10.0, 5.0]) {
        assert_eq!(section.points_earned, max * FAILING_SHARE);
        assert_eq!(section.max_points, max);
        assert_eq!(section.feedback, FAILING_FEEDBACK);
    }
    assert_eq!(grade.total_score, 5.0 * FAILING_SHARE + 10.0 * FAILING_SHARE);
    assert_eq!(grade.overall_feedback, FALLBACK_OVERALL_FEEDBACK);

    assert_eq!(saved_grade(&sub), grade);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn fallback_is_reproducible() {
    let root = temp_root();
    let rubric = rubric();
    let sub = submission(&root, "ada", &[("answers.py", "")]);
    let runner = CannedRunner(passed());

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .maybe_grader(None::<&ScriptedGrader>)
        .build();
    let first = pipeline.grade_submission(&sub).await;
    let second = pipeline.grade_submission(&sub).await;

    assert_eq!(first, second);
    assert_eq!(first.sections[0].feedback, PASSING_FEEDBACK);
    assert_eq!(first.sections[1].points_earned, 10.0 * PASSING_SHARE);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn semantic_judgment_is_reconciled_against_rubric() {
    let root = temp_root();
    let rubric = rubric();
    let report = "# Report\n\n![Filtered signal](figures/signal.png)\n\n![Gone](missing.png)\n";
    let sub = submission(
        &root,
        "ada",
        &[
            ("answers.py", "def load(): pass\n"),
            ("report.md", report),
            ("figures/signal.png", "PNG placeholder"),
        ],
    );
    let runner = CannedRunner(passed());
    let grader = ScriptedGrader::replying(
        r#"```json
{"sections": [
  {"section_name": "setup", "points_earned": 4, "feedback": "Environment documented."},
  {"section_name": "Data Loading", "points_earned": 12, "feedback": "Complete."}
], "overall_feedback": "Strong submission."}
```"#,
    );

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .grader(&grader)
        .build();
    let grade = pipeline.grade_submission(&sub).await;

    assert_eq!(grader.judged.load(Ordering::SeqCst), 1);
    assert_eq!(grader.images_seen.load(Ordering::SeqCst), 1);

    assert_eq!(grade.grading_mode, GradingMode::Semantic);
    let setup = grade.section("Setup").expect("setup");
    assert_eq!(setup.points_earned, 4.0);
    assert_eq!(setup.feedback, "Environment documented.");
    assert_eq!(grade.section("Data Loading").expect("loading").points_earned, 10.0);

    let bonus = grade.section("Bonus Plot").expect("bonus");
    assert!(bonus.is_extra);
    assert_eq!(bonus.points_earned, 0.0);
    assert_eq!(bonus.feedback, SECTION_NOT_GRADED);

    assert_eq!(grade.total_score, 14.0);
    assert_eq!(grade.overall_feedback, "Strong submission.");
    assert_eq!(saved_grade(&sub).grading_mode, GradingMode::Semantic);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn counted_policy_adds_extra_credit_to_total() {
    let root = temp_root();
    let rubric = rubric();
    let sub = submission(&root, "ada", &[("answers.py", "")]);
    let runner = CannedRunner(passed());
    let grader = ScriptedGrader::replying(
        r#"{"sections": {"Setup": 5, "Data Loading": 10, "Bonus Plot": 3}}"#,
    );

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .grader(&grader)
        .policy(ExtraCreditPolicy::Counted)
        .build();
    let grade = pipeline.grade_submission(&sub).await;

    assert_eq!(grade.total_score, 18.0);
    assert_eq!(grade.max_score, 15.0);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn grader_fault_falls_back_to_test_outcome() {
    let root = temp_root();
    let rubric = rubric();
    let sub = submission(
        &root,
        "ada",
        &[("answers.py", ""), ("report.md", "No figures here.")],
    );
    let runner = CannedRunner(passed());
    let grader = ScriptedGrader::timing_out();

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .grader(&grader)
        .build();
    let grade = pipeline.grade_submission(&sub).await;

    assert_eq!(grader.judged.load(Ordering::SeqCst), 1);
    assert_eq!(grade.grading_mode, GradingMode::Fallback);
    assert_eq!(grade.sections[0].points_earned, 5.0 * PASSING_SHARE);
    assert_eq!(grade.overall_feedback, FALLBACK_OVERALL_FEEDBACK);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn missing_answers_without_report_is_incomplete() {
    let root = temp_root();
    let rubric = rubric();
    let sub = submission(&root, "ada", &[("notes.txt", "forgot to push")]);
    let runner = CannedRunner(ExecutionResult::failed("Required file not found"));
    let grader = ScriptedGrader::replying(r#"{"sections": []}"#);

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .grader(&grader)
        .build();
    let grade = pipeline.grade_submission(&sub).await;

    assert_eq!(grader.judged.load(Ordering::SeqCst), 0);
    assert_eq!(grade.grading_mode, GradingMode::Incomplete);
    assert_eq!(grade.total_score, 0.0);
    assert!(grade.sections.iter().all(|s| s.points_earned == 0.0));
    assert!(grade.sections[0].feedback.contains("answers.py"));
    assert!(grade.overall_feedback.contains("Manual review is required"));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn missing_answers_with_report_is_still_judged() {
    let root = temp_root();
    let rubric = rubric();
    let sub = submission(&root, "ada", &[("report.md", "I explain my approach here.")]);
    let runner = CannedRunner(ExecutionResult::failed("Required file not found"));
    let grader = ScriptedGrader::replying(r#"{"sections": {"Setup": 2}}"#);

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .grader(&grader)
        .build();
    let grade = pipeline.grade_submission(&sub).await;

    assert_eq!(grader.judged.load(Ordering::SeqCst), 1);
    assert_eq!(grade.grading_mode, GradingMode::Semantic);
    assert_eq!(grade.total_score, 2.0);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn every_submission_gets_one_record() {
    let root = temp_root();
    let rubric = rubric();
    let submissions_dir = root.join("submissions");
    submission(&submissions_dir, "zed", &[("answers.py", "")]);
    submission(&submissions_dir, "amy", &[("teacher_answers.py", "")]);
    submission(&submissions_dir, "bo", &[]);
    fs::create_dir_all(submissions_dir.join(".git")).expect("hidden dir");
    fs::create_dir_all(submissions_dir.join("tests")).expect("tests dir");

    let submissions = find_submissions(&submissions_dir).expect("find submissions");
    let ids: Vec<_> = submissions.iter().map(|s| s.student_id.as_str()).collect();
    assert_eq!(ids, vec!["amy", "bo", "zed"]);

    let runner = CannedRunner(passed());
    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .maybe_grader(None::<&ScriptedGrader>)
        .build();
    let mut aggregator = Aggregator::new(root.join("grades"));
    pipeline.grade_all(&submissions, &mut aggregator).await;
    let saved = aggregator.finalize().expect("finalize");

    assert_eq!(saved.records.len(), 3);
    let modes: Vec<_> = aggregator.grades().iter().map(|g| g.grading_mode).collect();
    assert_eq!(
        modes,
        vec![GradingMode::Fallback, GradingMode::Incomplete, GradingMode::Fallback]
    );

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn persisting_reports_where_the_grade_went() {
    let root = temp_root();
    let rubric = rubric();
    let runner = CannedRunner(passed());
    let mut student = submission(&root, "ada", &[("answers.py", "")]);

    let persisted = Pending::new(&student, &rubric)
        .execute(&runner)
        .await
        .judge(None::<&ScriptedGrader>)
        .await
        .reconcile(ExtraCreditPolicy::Informational)
        .persist();
    let expected = student.path.join(GRADE_OUTPUT_FILENAME);
    assert_eq!(persisted.saved_to(), Some(&expected));
    assert_eq!(persisted.into_grade(), saved_grade(&student));

    student.path = root.join("ada").join("answers.py");
    let unsaved = Pending::new(&student, &rubric)
        .execute(&runner)
        .await
        .judge(None::<&ScriptedGrader>)
        .await
        .reconcile(ExtraCreditPolicy::Informational)
        .persist();
    assert_eq!(unsaved.saved_to(), None);
    assert_eq!(unsaved.into_grade().max_score, 15.0);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn skipped_semantic_grading_is_unavailable() {
    let root = temp_root();
    fs::write(root.join("README.md"), "# HW\n\n## Setup (5 pts)\n").expect("rubric");
    let cli = CliOverrides {
        submissions: Some(root.clone()),
        rubric: Some(root.join("README.md")),
        skip_semantic: true,
        ..CliOverrides::default()
    };
    let config = GraderConfig::resolve(FileConfig::default(), &cli).expect("resolve");

    let fault = semantic_grader(&config).err().expect("no grader when skipped");
    assert!(matches!(fault, SemanticGraderFault::Unavailable(_)));
    assert!(fault.to_string().contains("skipped"));

    let _ = fs::remove_dir_all(root);
}
