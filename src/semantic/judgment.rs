#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Model output is free text that is usually, but not always, the JSON we
//! asked for. Everything here is lenient about shape and strict about types:
//! whatever comes out is a [`RawJudgment`] with plain numbers and strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JudgmentError;

/// Keys accepted for a section's name.
const NAME_KEYS: [&str; 4] = ["section_name", "name", "section", "title"];
/// Keys accepted for a section's score.
const POINTS_KEYS: [&str; 5] = ["points_earned", "points", "score", "earned", "points_awarded"];
/// Keys accepted for a section's feedback.
const FEEDBACK_KEYS: [&str; 4] = ["feedback", "comments", "comment", "justification"];
/// Keys accepted for the list or map of sections.
const SECTIONS_KEYS: [&str; 3] = ["sections", "section_grades", "grades"];
/// Keys accepted for the overall feedback.
const OVERALL_KEYS: [&str; 3] = ["overall_feedback", "summary", "feedback"];

/// One section as scored by the semantic grader, before reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSection {
    /// Section name as the grader wrote it.
    pub name:          String,
    /// Score as the grader wrote it; may be out of range or NaN.
    pub points_earned: f64,
    /// Feedback text.
    pub feedback:      String,
}

impl RawSection {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, points_earned: f64, feedback: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points_earned,
            feedback: feedback.into(),
        }
    }
}

/// The semantic grader's per-section scores and summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawJudgment {
    /// Scored sections, in the order the grader returned them.
    pub sections:         Vec<RawSection>,
    /// Summary feedback, if the grader wrote one.
    pub overall_feedback: Option<String>,
}

impl RawJudgment {
    /// Interprets a model response.
    ///
    /// Code fences and surrounding prose are ignored; `sections` may be a
    /// list of objects or a map from name to score or object.
    pub fn from_response(text: &str) -> Result<Self, JudgmentError> {
        let json = extract_json_object(text).ok_or(JudgmentError::NoJson)?;
        let value: Value =
            serde_json::from_str(json).map_err(|e| JudgmentError::InvalidJson(e.to_string()))?;
        let Value::Object(root) = value else {
            return Err(JudgmentError::NoJson);
        };

        let sections = match first_of(&root, &SECTIONS_KEYS) {
            Some(Value::Array(items)) => items.iter().filter_map(section_from_item).collect(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(name, v)| section_from_entry(name, v))
                .collect(),
            _ => return Err(JudgmentError::MissingSections),
        };

        let overall_feedback = first_of(&root, &OVERALL_KEYS)
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            sections,
            overall_feedback,
        })
    }
}

/// The slice from the first `{` to the last `}`.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// First value present under any of `keys`.
fn first_of<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

/// Reads a score from a number, a numeric string, or an `"8/10"` string.
/// Anything else is NaN and clamps to zero downstream.
fn coerce_points(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let earned = s.split('/').next().unwrap_or_default();
            earned
                .trim()
                .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace())
                .parse()
                .unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// Reads feedback text from a string; other JSON is rendered as-is.
fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// `{"section_name": .., "points_earned": .., "feedback": ..}`
fn section_from_item(item: &Value) -> Option<RawSection> {
    let Value::Object(map) = item else {
        return None;
    };

    Some(RawSection {
        name:          coerce_text(first_of(map, &NAME_KEYS)),
        points_earned: coerce_points(first_of(map, &POINTS_KEYS)),
        feedback:      coerce_text(first_of(map, &FEEDBACK_KEYS)),
    })
}

/// `"Section Name": 8` or `"Section Name": {"points_earned": 8, ..}`
fn section_from_entry(name: &str, value: &Value) -> RawSection {
    match value {
        Value::Object(map) => RawSection {
            name:          name.to_string(),
            points_earned: coerce_points(first_of(map, &POINTS_KEYS)),
            feedback:      coerce_text(first_of(map, &FEEDBACK_KEYS)),
        },
        other => RawSection::new(name, coerce_points(Some(other)), ""),
    }
}
