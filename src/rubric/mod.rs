#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grading rubrics parsed from assignment markdown.

/// Markdown to [`Rubric`] parsing.
pub mod parser;

use std::fmt::Write as _;

use bon::Builder;
use serde::{Deserialize, Serialize};

pub use parser::{RubricParser, parse_rubric, parse_rubric_file};

/// One named, point-valued grading criterion.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct RubricSection {
    /// Heading text with the point group removed.
    name:               String,
    /// Maximum points available.
    points:             f64,
    /// Whether the section is extra credit.
    #[builder(default)]
    is_extra:           bool,
    /// First descriptive paragraph under the heading.
    #[builder(default)]
    description:        String,
    /// Function names the section expects the student to define.
    #[builder(default)]
    expected_functions: Vec<String>,
}

impl RubricSection {
    /// Heading text with the point group removed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum points available.
    pub fn points(&self) -> f64 {
        self.points
    }

    /// Whether the section is extra credit.
    pub fn is_extra(&self) -> bool {
        self.is_extra
    }

    /// First descriptive paragraph under the heading (may be empty).
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Function names the section expects, in first-seen order.
    pub fn expected_functions(&self) -> &[String] {
        &self.expected_functions
    }
}

/// A parsed grading schema, shared read-only across a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    /// Assignment title.
    title:           String,
    /// Point value written on the title heading, if any.
    declared_points: Option<f64>,
    /// Sections in document order.
    sections:        Vec<RubricSection>,
    /// Original rubric text, kept for LLM context.
    raw_content:     String,
}

impl Rubric {
    /// Assembles a rubric from already parsed parts.
    pub fn new(
        title: impl Into<String>,
        declared_points: Option<f64>,
        sections: Vec<RubricSection>,
        raw_content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            declared_points,
            sections,
            raw_content: raw_content.into(),
        }
    }

    /// Assignment title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Point value written on the title heading, if any.
    pub fn declared_points(&self) -> Option<f64> {
        self.declared_points
    }

    /// Sections in document order.
    pub fn sections(&self) -> &[RubricSection] {
        &self.sections
    }

    /// Original rubric text.
    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    /// Sum of points over sections that are not extra credit.
    pub fn total_points(&self) -> f64 {
        self.sections
            .iter()
            .filter(|s| !s.is_extra)
            .map(|s| s.points)
            .sum()
    }

    /// Renders the rubric as context for the semantic grader.
    pub fn to_prompt_text(&self) -> String {
        let mut out = format!(
            "# Assignment: {}\nTotal Points: {}\n\n## Grading Sections:\n",
            self.title,
            self.total_points()
        );

        for section in &self.sections {
            let extra_tag = if section.is_extra { " [EXTRA CREDIT]" } else { "" };
            let _ = write!(out, "\n### {} ({} pts){}\n", section.name, section.points, extra_tag);

            if !section.description.is_empty() {
                let _ = writeln!(out, "Description: {}", section.description);
            }
            if !section.expected_functions.is_empty() {
                let _ =
                    writeln!(out, "Expected Functions: {}", section.expected_functions.join(", "));
            }
        }

        out
    }
}
