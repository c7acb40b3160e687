#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::reconcile::{ExtraCreditPolicy, total_score};

/// Score and feedback for one rubric section.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct SectionGrade {
    /// Canonical rubric section name.
    pub section_name:  String,
    /// Points awarded, always within `0..=max_points`.
    pub points_earned: f64,
    /// Section maximum, copied from the rubric.
    pub max_points:    f64,
    /// Explanation of the score.
    pub feedback:      String,
    /// Whether the section is extra credit.
    #[serde(default)]
    #[builder(default)]
    pub is_extra:      bool,
}

/// How a grade record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingMode {
    /// Scores came from the semantic grader.
    #[default]
    Semantic,
    /// Scores came from the test-outcome heuristic.
    Fallback,
    /// The submission was missing required files and nothing could be
    /// judged.
    Incomplete,
}

impl Display for GradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            GradingMode::Semantic => "semantic",
            GradingMode::Fallback => "fallback",
            GradingMode::Incomplete => "incomplete",
        };
        f.write_str(label)
    }
}

/// The reconciled grade for one submission.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct GradeResult {
    /// Student identifier (submission directory name).
    pub student_id:            String,
    /// One entry per rubric section, in rubric order.
    pub sections:              Vec<SectionGrade>,
    /// Whether the test suite passed.
    pub code_execution_passed: bool,
    /// Sum of earned points, see [`GradeResult::recompute_total`].
    pub total_score:           f64,
    /// Rubric total, excluding extra credit.
    pub max_score:             f64,
    /// Summary feedback for the student.
    pub overall_feedback:      String,
    /// `owner/name` of the submission's GitHub remote.
    #[serde(default)]
    pub github_repo:           Option<String>,
    /// Where the submission was read from.
    #[serde(default)]
    pub submission_path:       Option<String>,
    /// How the scores were produced.
    #[serde(default)]
    #[builder(default)]
    pub grading_mode:          GradingMode,
}

impl GradeResult {
    /// Finds a section by its canonical name.
    pub fn section(&self, name: &str) -> Option<&SectionGrade> {
        self.sections.iter().find(|s| s.section_name == name)
    }

    /// Recomputes `total_score` from the sections.
    pub fn recompute_total(&mut self, policy: ExtraCreditPolicy) {
        self.total_score = total_score(&self.sections, policy);
    }

    /// `total_score` as a percentage of `max_score`, zero when nothing is
    /// possible.
    pub fn percentage(&self) -> f64 {
        if self.max_score > 0.0 {
            self.total_score / self.max_score * 100.0
        } else {
            0.0
        }
    }

    /// Key that orders records by repository, then student.
    pub fn sort_key(&self) -> (&str, &str) {
        (self.github_repo.as_deref().unwrap_or_default(), &self.student_id)
    }
}
