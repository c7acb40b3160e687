#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Turns loosely structured rubric markdown into a [`Rubric`].
//!
//! Gradable sections are headings carrying a parenthesized point value, e.g.
//! `## Data Loading (10 pts)` or `## Bonus Plot (Extra 5 points)`. The first
//! top-level heading is the assignment title and never a section.

use std::{collections::HashSet, path::Path, sync::LazyLock};

use anyhow::{Context, Result};
use bon::Builder;
use regex::Regex;

use super::{Rubric, RubricSection};
use crate::{
    constants::{
        DEFAULT_FENCE_LANGUAGE, DESCRIPTION_LIMIT, DESCRIPTION_MIN_LEN, EXTRA_CREDIT_KEYWORDS,
    },
    error::GraderError,
    util::truncate_with_ellipsis,
};

/// `# Title` with an optional trailing `(40)` / `(40 pts)`.
static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#\s+(.+?)\s*(?:\((\d+)\s*(?:pts|points)?\s*\))?$").expect("title regex")
});

/// Any heading followed by `(N)`, `(N pts)` or `(Extra N points)`.
static SECTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^#+\s+(.+?)\s*\((?:Extra\s+)?(\d+)\s*(?:pts|points)?\s*\)")
        .expect("section regex")
});

/// A fenced code block; group 1 is the info string's first word.
static FENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w*)(.*?)```").expect("fence regex"));

/// A Python function definition.
static DEF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"def\s+(\w+)\s*\(").expect("def regex"));

/// Prose such as "a function called `load_data`".
static CALLED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"called\s+[`'](\w+)[`']").expect("called regex"));

/// A paragraph opening with a numeral followed by a dot.
static NUMBERED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.").expect("numbered regex"));

/// Rubric parsing options.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct RubricParser {
    /// Lowercase keywords that mark a section name as extra credit.
    #[builder(default = EXTRA_CREDIT_KEYWORDS.iter().map(|k| k.to_string()).collect())]
    extra_keywords:  Vec<String>,
    /// Code fence language scanned for function definitions.
    #[builder(default = DEFAULT_FENCE_LANGUAGE.to_string())]
    fence_language:  String,
}

impl Default for RubricParser {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RubricParser {
    /// Parses `content`, using `fallback_title` when no `# Title` line exists.
    pub fn parse(&self, content: &str, fallback_title: &str) -> Result<Rubric, GraderError> {
        let text = content.replace("\r\n", "\n");

        let (title, declared_points) = extract_title(&text)
            .unwrap_or_else(|| (fallback_title.to_string(), None));

        let sections = self.extract_sections(&text, &title);
        if sections.is_empty() {
            return Err(GraderError::RubricFormat(title));
        }

        let rubric = Rubric::new(title, declared_points, sections, content);
        if let Some(declared) = rubric.declared_points()
            && declared != rubric.total_points()
        {
            tracing::warn!(
                "Rubric `{}` declares {} points but its sections add up to {}",
                rubric.title(),
                declared,
                rubric.total_points()
            );
        }

        Ok(rubric)
    }

    /// Collects every point-valued heading except the title.
    fn extract_sections(&self, text: &str, title: &str) -> Vec<RubricSection> {
        let headings: Vec<_> = SECTION_PATTERN.captures_iter(text).collect();
        let title = title.to_lowercase();
        let mut sections = Vec::new();

        for (i, caps) in headings.iter().enumerate() {
            let name = caps[1].trim();
            if name.to_lowercase() == title {
                continue;
            }

            let Ok(points) = caps[2].parse::<f64>() else {
                continue;
            };

            let start = caps.get(0).map_or(0, |m| m.end());
            let end = headings
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = &text[start..end];

            sections.push(
                RubricSection::builder()
                    .name(name)
                    .points(points)
                    .is_extra(self.is_extra_credit(name))
                    .description(extract_description(body))
                    .expected_functions(self.extract_functions(body))
                    .build(),
            );
        }

        sections
    }

    /// Whether `name` contains any extra-credit keyword.
    pub fn is_extra_credit(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.extra_keywords
            .iter()
            .any(|keyword| name.contains(keyword.as_str()))
    }

    /// Function names defined in fenced blocks of the configured language,
    /// then names quoted after "called", deduplicated in first-seen order.
    fn extract_functions(&self, body: &str) -> Vec<String> {
        let language = self.fence_language.to_lowercase();

        let defined = FENCE_PATTERN
            .captures_iter(body)
            .filter(|caps| caps[1].to_lowercase().starts_with(&language))
            .flat_map(|caps| {
                let block = caps.get(2).map_or("", |m| m.as_str());
                DEF_PATTERN
                    .captures_iter(block)
                    .map(|c| c[1].to_string())
                    .collect::<Vec<_>>()
            });
        let mentioned = CALLED_PATTERN
            .captures_iter(body)
            .map(|caps| caps[1].to_string());

        let mut seen = HashSet::new();
        defined
            .chain(mentioned)
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }
}

/// Title text and declared points from the first `# ` heading.
fn extract_title(text: &str) -> Option<(String, Option<f64>)> {
    let caps = TITLE_PATTERN.captures(text)?;
    let title = caps[1].trim().to_string();
    let points = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
    Some((title, points))
}

/// First substantial prose paragraph of a section body.
fn extract_description(body: &str) -> String {
    let prose = FENCE_PATTERN.replace_all(body, "");

    prose
        .trim()
        .split("\n\n")
        .map(str::trim)
        .find(|para| {
            para.chars().count() > DESCRIPTION_MIN_LEN
                && !para.starts_with(['-', '*', '+'])
                && !NUMBERED_PATTERN.is_match(para)
        })
        .map(|para| truncate_with_ellipsis(para, DESCRIPTION_LIMIT))
        .unwrap_or_default()
}

/// Parses rubric text with default options.
pub fn parse_rubric(content: &str, fallback_title: &str) -> Result<Rubric, GraderError> {
    RubricParser::default().parse(content, fallback_title)
}

/// Reads and parses a rubric file; its directory name is the fallback title.
pub fn parse_rubric_file(path: &Path, parser: &RubricParser) -> Result<Rubric> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read rubric {}", path.display()))?;
    let fallback_title = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(parser.parse(&content, &fallback_title)?)
}
