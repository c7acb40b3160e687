#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The per-submission grading lifecycle as consuming stage values:
//!
//! `Pending -> Executed -> Judged -> Reconciled -> Persisted`
//!
//! Each transition takes the previous stage by value, so a grade cannot be
//! persisted before it was reconciled, nor reconciled before the tests ran.

use std::path::PathBuf;

use super::{
    fallback::{
        FALLBACK_OVERALL_FEEDBACK, fallback_sections, incomplete_overall_feedback,
        incomplete_sections,
    },
    reconcile::{ExtraCreditPolicy, reconcile, total_score},
    results::{GradeResult, GradingMode},
};
use crate::{
    constants::{GRADE_OUTPUT_FILENAME, POSSIBLE_ANSWERS_FILENAMES},
    error::GraderError,
    execution::{ExecutionAdapter, ExecutionResult},
    rubric::Rubric,
    semantic::{
        JudgmentRequest, RawJudgment, RawSection, SemanticGrader, images::describe_report_images,
    },
    submission::Submission,
    util::write_json,
};

/// Where a judgment came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Judgment {
    /// The semantic grader answered.
    Semantic(RawJudgment),
    /// Heuristic scores from the test outcome.
    Fallback(Vec<RawSection>),
    /// Zero scores; the submission lacked what grading needs.
    Incomplete {
        /// Zero-score sections.
        sections: Vec<RawSection>,
        /// Why nothing could be judged.
        reason:   String,
    },
}

impl Judgment {
    /// The mode recorded on the final grade.
    pub fn mode(&self) -> GradingMode {
        match self {
            Judgment::Semantic(_) => GradingMode::Semantic,
            Judgment::Fallback(_) => GradingMode::Fallback,
            Judgment::Incomplete { .. } => GradingMode::Incomplete,
        }
    }
}

/// A submission waiting to be executed.
pub struct Pending<'a> {
    /// The submission.
    submission: &'a Submission,
    /// Rubric for the run.
    rubric:     &'a Rubric,
}

/// A submission whose tests have run.
pub struct Executed<'a> {
    /// The submission.
    submission: &'a Submission,
    /// Rubric for the run.
    rubric:     &'a Rubric,
    /// Test evidence.
    execution:  ExecutionResult,
}

/// A submission with raw scores, not yet checked against the rubric.
pub struct Judged<'a> {
    /// The submission.
    submission: &'a Submission,
    /// Rubric for the run.
    rubric:     &'a Rubric,
    /// Test evidence.
    execution:  ExecutionResult,
    /// Raw scores and their origin.
    judgment:   Judgment,
}

/// A final grade, not yet written anywhere.
#[derive(Debug)]
pub struct Reconciled {
    /// The grade.
    grade:           GradeResult,
    /// Submission directory the grade belongs to.
    submission_path: PathBuf,
}

/// A final grade after the write to the submission directory was attempted.
#[derive(Debug)]
pub struct Persisted {
    /// The grade.
    grade:    GradeResult,
    /// Where it was written, if the write succeeded.
    saved_to: Option<PathBuf>,
}

impl<'a> Pending<'a> {
    /// Starts the lifecycle for `submission`.
    pub fn new(submission: &'a Submission, rubric: &'a Rubric) -> Self {
        Self { submission, rubric }
    }

    /// Runs the test suite. Never fails; faults live in the result.
    pub async fn execute<A: ExecutionAdapter>(self, adapter: &A) -> Executed<'a> {
        let execution = adapter.run(&self.submission.path).await;
        if execution.timeout_exceeded {
            tracing::warn!(student = %self.submission.student_id, "Test execution timed out");
        }

        Executed {
            submission: self.submission,
            rubric: self.rubric,
            execution,
        }
    }
}

impl<'a> Executed<'a> {
    /// Test evidence gathered so far.
    pub fn execution(&self) -> &ExecutionResult {
        &self.execution
    }

    /// Obtains raw scores from `grader`, or from the fallback heuristic when
    /// no grader is given or it fails.
    pub async fn judge<G: SemanticGrader>(self, grader: Option<&G>) -> Judged<'a> {
        let student_id = self.submission.student_id.as_str();
        let missing_answers = self.submission.answers_file.is_none();
        let report = self.submission.report.as_deref();

        let judgment = match grader {
            Some(_) if missing_answers && report.is_none() => self.incomplete(),
            Some(grader) => {
                let images = match report {
                    Some(text) => {
                        describe_report_images(grader, student_id, &self.submission.path, text)
                            .await
                    }
                    None => Vec::new(),
                };
                let request = JudgmentRequest {
                    student_id,
                    rubric: self.rubric,
                    execution: &self.execution,
                    report,
                    images: &images,
                };

                match grader.judge(&request).await {
                    Ok(raw) => Judgment::Semantic(raw),
                    Err(e) => {
                        tracing::warn!(student = student_id, "Semantic grading failed: {e}");
                        self.heuristic()
                    }
                }
            }
            None => self.heuristic(),
        };

        Judged {
            submission: self.submission,
            rubric: self.rubric,
            execution: self.execution,
            judgment,
        }
    }

    /// Fallback scores, or zeros when there was no code to test.
    fn heuristic(&self) -> Judgment {
        if self.submission.answers_file.is_none() {
            self.incomplete()
        } else {
            Judgment::Fallback(fallback_sections(self.rubric, &self.execution))
        }
    }

    /// Zero scores explaining which file was missing.
    fn incomplete(&self) -> Judgment {
        let reason = GraderError::SubmissionIncomplete {
            path:     self.submission.path.clone(),
            expected: POSSIBLE_ANSWERS_FILENAMES.join(" or "),
        }
        .to_string();

        Judgment::Incomplete {
            sections: incomplete_sections(self.rubric, &reason),
            reason,
        }
    }
}

impl Judged<'_> {
    /// Raw scores and their origin.
    pub fn judgment(&self) -> &Judgment {
        &self.judgment
    }

    /// Maps raw scores onto the rubric and computes totals.
    pub fn reconcile(self, policy: ExtraCreditPolicy) -> Reconciled {
        let grading_mode = self.judgment.mode();
        let (raw, overall_feedback) = match self.judgment {
            Judgment::Semantic(raw) => {
                let overall = raw.overall_feedback.unwrap_or_default();
                (raw.sections, overall)
            }
            Judgment::Fallback(sections) => (sections, FALLBACK_OVERALL_FEEDBACK.to_string()),
            Judgment::Incomplete { sections, reason } => {
                (sections, incomplete_overall_feedback(&reason))
            }
        };

        let sections = reconcile(self.rubric, &raw);
        let grade = GradeResult {
            student_id: self.submission.student_id.clone(),
            total_score: total_score(&sections, policy),
            sections,
            code_execution_passed: self.execution.success,
            max_score: self.rubric.total_points(),
            overall_feedback,
            github_repo: self.submission.github_repo.clone(),
            submission_path: Some(self.submission.path.display().to_string()),
            grading_mode,
        };

        Reconciled {
            grade,
            submission_path: self.submission.path.clone(),
        }
    }
}

impl Reconciled {
    /// The final grade.
    pub fn grade(&self) -> &GradeResult {
        &self.grade
    }

    /// Writes the grade next to the submission's files. A failed write is
    /// logged and does not stop the run.
    pub fn persist(self) -> Persisted {
        let path = self.submission_path.join(GRADE_OUTPUT_FILENAME);
        let saved_to = match write_json(&path, &self.grade) {
            Ok(()) => Some(path),
            Err(source) => {
                let err = GraderError::Persistence { path, source };
                tracing::warn!(student = %self.grade.student_id, "{err}");
                None
            }
        };

        Persisted {
            grade: self.grade,
            saved_to,
        }
    }
}

impl Persisted {
    /// Where the grade was written, if it was.
    pub fn saved_to(&self) -> Option<&PathBuf> {
        self.saved_to.as_ref()
    }

    /// Hands the grade over, typically to the aggregator.
    pub fn into_grade(self) -> GradeResult {
        self.grade
    }
}
