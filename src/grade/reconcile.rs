#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Maps whatever section names the semantic grader used back onto the
//! rubric's canonical sections.

use serde::{Deserialize, Serialize};

use super::results::SectionGrade;
use crate::{constants::SECTION_NOT_GRADED, rubric::Rubric, semantic::RawSection};

/// Whether extra-credit points count toward `total_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraCreditPolicy {
    /// Extra sections are scored and shown but not added to the total.
    #[default]
    Informational,
    /// Extra sections add to the total; `max_score` is unchanged.
    Counted,
}

/// A way of deciding that a raw section answers for a rubric section.
type Matcher = fn(rubric_name: &str, raw_name: &str) -> bool;

/// Matchers tried in order; the first tier with any hit wins.
const MATCHERS: [(&str, Matcher); 3] = [
    ("exact", exact),
    ("case-insensitive", case_insensitive),
    ("substring", substring),
];

/// Identical names.
fn exact(rubric_name: &str, raw_name: &str) -> bool {
    rubric_name == raw_name
}

/// Names equal ignoring case.
fn case_insensitive(rubric_name: &str, raw_name: &str) -> bool {
    rubric_name.to_lowercase() == raw_name.to_lowercase()
}

/// Either name contains the other, ignoring case.
fn substring(rubric_name: &str, raw_name: &str) -> bool {
    let (rubric_name, raw_name) = (rubric_name.to_lowercase(), raw_name.to_lowercase());
    rubric_name.contains(&raw_name) || raw_name.contains(&rubric_name)
}

/// Finds the raw section for `rubric_name`. Blank raw names never match.
pub fn match_section<'a>(rubric_name: &str, raw: &'a [RawSection]) -> Option<&'a RawSection> {
    MATCHERS.iter().find_map(|(tier, matches)| {
        let found = raw
            .iter()
            .filter(|candidate| !candidate.name.trim().is_empty())
            .find(|candidate| matches(rubric_name, candidate.name.trim()))?;
        tracing::debug!("Matched rubric `{rubric_name}` to `{}` ({tier})", found.name);
        Some(found)
    })
}

/// Clamps `raw` into `0..=max`; NaN becomes zero.
pub fn clamp_points(raw: f64, max: f64) -> f64 {
    if raw.is_nan() { 0.0 } else { raw.max(0.0).min(max) }
}

/// Produces exactly one grade per rubric section, in rubric order.
pub fn reconcile(rubric: &Rubric, raw: &[RawSection]) -> Vec<SectionGrade> {
    rubric
        .sections()
        .iter()
        .map(|section| {
            let (points_earned, feedback) = match match_section(section.name(), raw) {
                Some(found) => {
                    (clamp_points(found.points_earned, section.points()), found.feedback.clone())
                }
                None => {
                    tracing::debug!("No match for rubric section `{}`", section.name());
                    (0.0, SECTION_NOT_GRADED.to_string())
                }
            };

            SectionGrade {
                section_name: section.name().to_string(),
                points_earned,
                max_points: section.points(),
                feedback,
                is_extra: section.is_extra(),
            }
        })
        .collect()
}

/// Sum of earned points under `policy`.
pub fn total_score(sections: &[SectionGrade], policy: ExtraCreditPolicy) -> f64 {
    sections
        .iter()
        .filter(|s| policy == ExtraCreditPolicy::Counted || !s.is_extra)
        .map(|s| s.points_earned)
        .sum()
}
