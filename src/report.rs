#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Console tables for individual grades and the cohort.

use colored::Colorize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use crate::{
    aggregate::CohortStatistics,
    grade::{GradeResult, SectionGrade},
};

/// Share of a section's points at or above which it is shown as passing.
const PASSING_SHARE: f64 = 0.7;

/// One section in a student's table.
#[derive(Tabled)]
struct SectionRow {
    /// `+` or `-`.
    #[tabled(rename = "")]
    status:   String,
    /// Section name, tagged when extra credit.
    #[tabled(rename = "Section")]
    section:  String,
    /// `earned/max`.
    #[tabled(rename = "Grade")]
    grade:    String,
    /// Feedback text.
    #[tabled(rename = "Feedback")]
    feedback: String,
}

impl From<&SectionGrade> for SectionRow {
    fn from(section: &SectionGrade) -> Self {
        let passing = section.points_earned >= section.max_points * PASSING_SHARE;
        let status = if passing { "+".green() } else { "-".red() };
        let name = if section.is_extra {
            format!("{} [EXTRA]", section.section_name)
        } else {
            section.section_name.clone()
        };

        Self {
            status:   status.to_string(),
            section:  name,
            grade:    format!("{:.1}/{:.1}", section.points_earned, section.max_points),
            feedback: section.feedback.clone(),
        }
    }
}

/// One student in the cohort table.
#[derive(Tabled)]
struct StudentRow {
    /// Student id.
    #[tabled(rename = "Student")]
    student: String,
    /// Repository, if known.
    #[tabled(rename = "Repository")]
    repo:    String,
    /// `total/max`.
    #[tabled(rename = "Score")]
    score:   String,
    /// Percentage.
    #[tabled(rename = "%")]
    percent: String,
    /// Test status.
    #[tabled(rename = "Tests")]
    tests:   String,
    /// Grading mode.
    #[tabled(rename = "Mode")]
    mode:    String,
}

impl From<&GradeResult> for StudentRow {
    fn from(grade: &GradeResult) -> Self {
        let tests = if grade.code_execution_passed { "PASSED".green() } else { "FAILED".red() };
        Self {
            student: grade.student_id.clone(),
            repo:    grade.github_repo.clone().unwrap_or_default(),
            score:   format!("{:.1}/{:.1}", grade.total_score, grade.max_score),
            percent: format!("{:.1}", grade.percentage()),
            tests:   tests.to_string(),
            mode:    grade.grading_mode.to_string(),
        }
    }
}

/// A student's per-section breakdown.
pub fn grade_table(grade: &GradeResult) -> String {
    let rows: Vec<SectionRow> = grade.sections.iter().map(SectionRow::from).collect();
    let tests = if grade.code_execution_passed { "Yes" } else { "No" };

    Table::new(&rows)
        .with(Panel::header(format!("{} ({})", grade.student_id, grade.grading_mode)))
        .with(Panel::footer(format!(
            "Total: {:.1}/{:.1}  Tests passed: {tests}",
            grade.total_score, grade.max_score
        )))
        .with(Modify::new(Rows::new(1..)).with(Width::wrap(48).keep_words(true)))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(
            Modify::new(Rows::last())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// One line per student with the cohort statistics underneath.
pub fn cohort_table(grades: &[GradeResult]) -> String {
    let rows: Vec<StudentRow> = grades.iter().map(StudentRow::from).collect();
    let footer = match CohortStatistics::compute(grades) {
        Some(stats) => format!(
            "Average {:.1}/{:.1}  High {:.1}  Low {:.1}  Tests passed {}/{} ({:.1}%)",
            stats.average_score,
            stats.max_possible,
            stats.highest_score,
            stats.lowest_score,
            stats.tests_passed_count,
            grades.len(),
            stats.tests_passed_percent
        ),
        None => "No grades".to_string(),
    };

    Table::new(&rows)
        .with(Panel::header("Grading Overview"))
        .with(Panel::footer(footer))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}
