#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! LLM-backed review of a submission's report against the rubric.

/// OpenAI-compatible grader client.
pub mod client;
/// Image links in reports and their descriptions.
pub mod images;
/// Coercion of free-form model output into a [`RawJudgment`].
pub mod judgment;
/// Prompt assembly.
pub mod prompt;

use std::{future::Future, path::Path};

use serde::{Deserialize, Serialize};

pub use client::OpenAiGrader;
pub use judgment::{RawJudgment, RawSection};

use crate::{error::SemanticGraderFault, execution::ExecutionResult, rubric::Rubric};

/// Description of a figure embedded in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescription {
    /// Image file name.
    pub filename:    String,
    /// Caption from the markdown link, possibly empty.
    #[serde(default)]
    pub caption:     String,
    /// Generated description, or the reason none could be produced.
    pub description: String,
}

/// Everything the semantic grader sees for one submission.
#[derive(Debug, Clone, Copy)]
pub struct JudgmentRequest<'a> {
    /// Student identifier, used for logging.
    pub student_id: &'a str,
    /// Rubric being graded against.
    pub rubric:     &'a Rubric,
    /// Test execution evidence.
    pub execution:  &'a ExecutionResult,
    /// Report text, if the submission has one.
    pub report:     Option<&'a str>,
    /// Descriptions of figures in the report.
    pub images:     &'a [ImageDescription],
}

/// A service that scores a submission section by section.
pub trait SemanticGrader {
    /// Produces a raw per-section judgment for `request`.
    fn judge(
        &self,
        request: &JudgmentRequest<'_>,
    ) -> impl Future<Output = Result<RawJudgment, SemanticGraderFault>> + Send;

    /// Describes the image at `path`. Failures are folded into the
    /// description text.
    fn describe_image(
        &self,
        path: &Path,
        caption: &str,
    ) -> impl Future<Output = ImageDescription> + Send;
}
