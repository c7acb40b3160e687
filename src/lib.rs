//! # gradepod
//!
//! Grades homework submissions by running the instructor's pytest suite,
//! asking an LLM to review the student's report against a markdown rubric,
//! and reconciling both into one auditable grade per student.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Cohort collection, statistics and export
pub mod aggregate;
/// Run configuration
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Error taxonomy
pub mod error;
/// Running a submission's tests
pub mod execution;
/// Grade records, reconciliation and the per-submission lifecycle
pub mod grade;
/// Orchestration of a grading run
pub mod pipeline;
/// Subprocess helpers
pub mod process;
/// Console tables
pub mod report;
/// Rubric model and parser
pub mod rubric;
/// LLM-backed semantic grading
pub mod semantic;
/// Submission discovery
pub mod submission;
/// Utility functions for convenience
pub mod util;

use std::path::Path;

use anyhow::{Context, Result, bail};
use grade::{ExtraCreditPolicy, GradeResult, SectionEdit};

/// Prints previously saved grades without grading anything.
pub fn show_saved_grades(grades_dir: &Path) -> Result<Vec<GradeResult>> {
    if !grades_dir.is_dir() {
        bail!(error::GraderError::Config(format!(
            "Grades directory not found: {}",
            grades_dir.display()
        )));
    }

    let grades = aggregate::load_grades_from_dir(grades_dir)?;
    if grades.is_empty() {
        bail!("No grades found in {}", grades_dir.display());
    }

    for grade in &grades {
        eprintln!("{}", report::grade_table(grade));
    }
    eprintln!("{}", report::cohort_table(&grades));
    Ok(grades)
}

/// Applies a manual correction to one student's saved grade, then rewrites
/// that student's record, the summary and the CSV export.
pub fn adjust_grade(
    grades_dir: &Path,
    student_id: &str,
    edit: SectionEdit,
    overall_feedback: Option<String>,
    policy: ExtraCreditPolicy,
) -> Result<GradeResult> {
    let mut grades = aggregate::load_grades_from_dir(grades_dir)?;
    let index = grades
        .iter()
        .position(|g| g.student_id == student_id)
        .with_context(|| format!("No saved grade for `{student_id}` in {}", grades_dir.display()))?;

    let original = grades.remove(index);
    let before = original.total_score;
    let mut edited = grade::apply_edits(original, std::slice::from_ref(&edit), policy)?;
    if let Some(feedback) = overall_feedback {
        edited = grade::with_overall_feedback(edited, feedback);
    }
    tracing::info!(
        student = student_id,
        "Adjusted `{}`: total {before:.1} -> {:.1}",
        edit.section,
        edited.total_score
    );

    grades.push(edited.clone());
    let mut aggregator = aggregate::Aggregator::with_grades(grades_dir, grades);
    aggregator.finalize()?;

    eprintln!("{}", report::grade_table(&edited));
    Ok(edited)
}
