#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::{execution::ExecutionResult, rubric::Rubric, semantic::RawSection};

/// Share of each section awarded when the tests passed.
pub const PASSING_SHARE: f64 = 0.7;

/// Share of each section awarded when the tests failed.
pub const FAILING_SHARE: f64 = 0.3;

/// Section feedback when the tests passed.
pub const PASSING_FEEDBACK: &str = "Tests passed. Manual review needed for full grading.";

/// Section feedback when the tests failed.
pub const FAILING_FEEDBACK: &str = "Tests failed. Manual review required.";

/// Overall feedback on a fallback grade.
pub const FALLBACK_OVERALL_FEEDBACK: &str = "LLM grading failed. This is a fallback result based \
                                             on test execution. Manual review is required for \
                                             accurate grading.";

/// Heuristic scores derived only from whether the tests passed.
pub fn fallback_sections(rubric: &Rubric, execution: &ExecutionResult) -> Vec<RawSection> {
    let (share, feedback) = if execution.success {
        (PASSING_SHARE, PASSING_FEEDBACK)
    } else {
        (FAILING_SHARE, FAILING_FEEDBACK)
    };

    rubric
        .sections()
        .iter()
        .map(|s| RawSection::new(s.name(), s.points() * share, feedback))
        .collect()
}

/// Zero scores for a submission that could not be judged at all.
pub fn incomplete_sections(rubric: &Rubric, reason: &str) -> Vec<RawSection> {
    rubric
        .sections()
        .iter()
        .map(|s| RawSection::new(s.name(), 0.0, reason))
        .collect()
}

/// Overall feedback for an incomplete submission.
pub fn incomplete_overall_feedback(reason: &str) -> String {
    format!("{reason} No credit could be awarded. Manual review is required.")
}
