#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use bon::Builder;

use super::{
    reconcile::{ExtraCreditPolicy, clamp_points},
    results::GradeResult,
};
use crate::error::EditError;

/// A manual correction to one section of a grade.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(on(String, into))]
pub struct SectionEdit {
    /// Canonical section name.
    pub section:  String,
    /// Replacement score, clamped to the section maximum.
    pub points:   Option<f64>,
    /// Replacement feedback.
    pub feedback: Option<String>,
}

/// Applies `edits` in order and recomputes the total.
///
/// The input is consumed and a new record is returned; nothing is written
/// to disk.
pub fn apply_edits(
    mut grade: GradeResult,
    edits: &[SectionEdit],
    policy: ExtraCreditPolicy,
) -> Result<GradeResult, EditError> {
    for edit in edits {
        let student_id = grade.student_id.clone();
        let section = grade
            .sections
            .iter_mut()
            .find(|s| s.section_name == edit.section)
            .ok_or_else(|| EditError::UnknownSection {
                student_id,
                section: edit.section.clone(),
            })?;

        if let Some(points) = edit.points {
            if !points.is_finite() {
                return Err(EditError::InvalidPoints(edit.section.clone()));
            }
            section.points_earned = clamp_points(points, section.max_points);
        }
        if let Some(feedback) = &edit.feedback {
            section.feedback = feedback.clone();
        }
    }

    grade.recompute_total(policy);
    Ok(grade)
}

/// Replaces the overall feedback.
pub fn with_overall_feedback(mut grade: GradeResult, feedback: impl Into<String>) -> GradeResult {
    grade.overall_feedback = feedback.into();
    grade
}
