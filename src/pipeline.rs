#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Drives every submission through the grading lifecycle.

use anyhow::{Context, Result};
use bon::Builder;

use crate::{
    aggregate::{Aggregator, SavedFiles},
    config::{GraderConfig, KeySource, OpenAiSettings},
    error::SemanticGraderFault,
    execution::{ExecutionAdapter, LocalRunner},
    grade::{ExtraCreditPolicy, GradeResult, Pending},
    report::{cohort_table, grade_table},
    rubric::{Rubric, RubricParser, parse_rubric_file},
    semantic::{OpenAiGrader, SemanticGrader},
    submission::{Submission, find_submissions},
};

/// Number of test log lines echoed at debug level.
const TEST_LOG_PREVIEW_LINES: usize = 20;

/// Grades submissions one after another against a shared rubric.
#[derive(Builder)]
pub struct Pipeline<'a, A: ExecutionAdapter, G: SemanticGrader> {
    /// Rubric for the run.
    rubric:      &'a Rubric,
    /// Runs the tests.
    adapter:     &'a A,
    /// Semantic grader; `None` means fallback grading only.
    grader:      Option<&'a G>,
    /// Whether extra credit counts toward totals.
    #[builder(default)]
    policy:      ExtraCreditPolicy,
    /// Print a table per graded submission.
    #[builder(default)]
    show_tables: bool,
}

impl<A: ExecutionAdapter, G: SemanticGrader> Pipeline<'_, A, G> {
    /// Grades one submission and writes its `grade.json`.
    pub async fn grade_submission(&self, submission: &Submission) -> GradeResult {
        let student = submission.student_id.as_str();

        let executed = Pending::new(submission, self.rubric)
            .execute(self.adapter)
            .await;
        let execution = executed.execution();
        if execution.success {
            tracing::info!(student, "Tests: PASSED");
        } else {
            tracing::info!(student, "Tests: FAILED (exit code {})", execution.exit_code);
        }
        for line in execution.test_log.lines().take(TEST_LOG_PREVIEW_LINES) {
            tracing::debug!(student, "{line}");
        }

        let persisted = executed
            .judge(self.grader)
            .await
            .reconcile(self.policy)
            .persist();
        if let Some(path) = persisted.saved_to() {
            tracing::info!(student, "Saved grade to {}", path.display());
        }
        let grade = persisted.into_grade();

        if self.show_tables {
            eprintln!("{}", grade_table(&grade));
        }
        grade
    }

    /// Grades every submission into `aggregator`. Exactly one record is
    /// added per submission.
    pub async fn grade_all(&self, submissions: &[Submission], aggregator: &mut Aggregator) {
        let total = submissions.len();
        for (i, submission) in submissions.iter().enumerate() {
            tracing::info!("[{}/{total}] Processing {}", i + 1, submission.student_id);
            aggregator.add(self.grade_submission(submission).await);
        }
    }
}

/// Builds the semantic grader, or says why none is available.
pub fn semantic_grader(config: &GraderConfig) -> Result<OpenAiGrader, SemanticGraderFault> {
    if config.skip_semantic {
        return Err(SemanticGraderFault::Unavailable(
            "semantic grading was skipped".into(),
        ));
    }

    let (settings, source) = OpenAiSettings::resolve(&config.openai).ok_or_else(|| {
        SemanticGraderFault::Unavailable(
            "OpenAI API key not found. Set OPENAI_API_KEY, add machine OPENAI to your .netrc \
             file, or set openai.api_key in the configuration file"
                .into(),
        )
    })?;
    let source = match source {
        KeySource::ConfigFile => "configuration file",
        KeySource::Netrc => ".netrc",
        KeySource::Environment => "OPENAI_API_KEY",
    };
    tracing::info!("Semantic grading with `{}` (key from {source})", settings.model());
    Ok(OpenAiGrader::new(settings))
}

/// Runs a complete grading pass and writes the aggregate outputs.
pub async fn run(config: &GraderConfig) -> Result<(Vec<GradeResult>, SavedFiles)> {
    tracing::info!("Parsing rubric from {}", config.rubric_path.display());
    let rubric = parse_rubric_file(&config.rubric_path, &RubricParser::default())?;
    tracing::info!(
        "Found {} sections, {} total points",
        rubric.sections().len(),
        rubric.total_points()
    );
    for section in rubric.sections() {
        let extra = if section.is_extra() { " [EXTRA]" } else { "" };
        tracing::debug!("  - {}: {} pts{extra}", section.name(), section.points());
    }

    let submissions = find_submissions(&config.submissions_dir)?;
    tracing::info!(
        "Found {} submissions in {}",
        submissions.len(),
        config.submissions_dir.display()
    );

    let runner = LocalRunner::builder()
        .timeout_secs(config.timeout_secs)
        .maybe_tests_dir(config.tests_dir.clone())
        .maybe_test_data_dir(config.test_data_dir.clone())
        .maybe_python(config.python.clone())
        .build();
    let grader = match semantic_grader(config) {
        Ok(grader) => Some(grader),
        Err(fault) if config.skip_semantic => {
            tracing::info!("{fault}; using fallback grades");
            None
        }
        Err(fault) => {
            tracing::warn!("{fault}. Using fallback grades.");
            None
        }
    };

    let pipeline = Pipeline::builder()
        .rubric(&rubric)
        .adapter(&runner)
        .maybe_grader(grader.as_ref())
        .policy(config.extra_credit)
        .show_tables(true)
        .build();

    let mut aggregator = Aggregator::new(&config.grades_dir);
    pipeline.grade_all(&submissions, &mut aggregator).await;

    let saved = aggregator
        .finalize()
        .context("Could not save aggregated grades")?;
    tracing::info!("Summary JSON: {}", saved.summary.display());
    if let Some(csv) = &saved.csv {
        tracing::info!("Summary CSV:  {}", csv.display());
    }

    let grades = aggregator.grades().to_vec();
    if !grades.is_empty() {
        eprintln!("{}", cohort_table(&grades));
    }
    Ok((grades, saved))
}
