#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Manual corrections.
pub mod edit;
/// Deterministic scores used when semantic grading is unavailable.
pub mod fallback;
/// Per-submission stage values.
pub mod lifecycle;
/// Matching raw judgments onto rubric sections.
pub mod reconcile;
/// Grade record types.
pub mod results;

pub use edit::{SectionEdit, apply_edits, with_overall_feedback};
pub use lifecycle::{Executed, Judged, Judgment, Pending, Persisted, Reconciled};
pub use reconcile::{ExtraCreditPolicy, clamp_points, match_section, reconcile, total_score};
pub use results::{GradeResult, GradingMode, SectionGrade};
