#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Error taxonomy for a grading run.
//!
//! Only [`GraderError::RubricFormat`] and [`GraderError::Config`] abort a run.
//! Everything else is scoped to one submission and ends up as evidence in that
//! submission's grade.

use std::path::PathBuf;

/// Errors raised by the grading core.
#[derive(thiserror::Error, Debug)]
pub enum GraderError {
    /// The rubric text contained no heading with a point value.
    #[error("No grading sections found in rubric `{0}`.")]
    RubricFormat(String),
    /// A submission lacks the source file the tests import.
    #[error("Required file ({expected}) not found in {}.", path.display())]
    SubmissionIncomplete {
        /// Submission directory that was inspected.
        path:     PathBuf,
        /// Human readable list of accepted file names.
        expected: String,
    },
    /// A grade record could not be written.
    #[error("Could not persist grade record to {}: {source}", path.display())]
    Persistence {
        /// Destination that failed.
        path:   PathBuf,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },
    /// Top-level configuration is unusable (missing directories, bad file).
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures reaching the semantic grader or interpreting what it returned.
///
/// Every variant is downgraded to a fallback grade by the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SemanticGraderFault {
    /// Semantic grading is disabled or no credentials were found.
    #[error("Semantic grader is not available: {0}")]
    Unavailable(String),
    /// The request could not be built or the API returned an error.
    #[error("Request to `{model}` failed: {message}")]
    Request {
        /// Model the request was sent to.
        model:   String,
        /// Error reported by the client.
        message: String,
    },
    /// The request did not finish within the configured limit.
    #[error("Request to `{model}` timed out after {secs}s")]
    Timeout {
        /// Model the request was sent to.
        model: String,
        /// Configured limit in seconds.
        secs:  u64,
    },
    /// The response had no message content.
    #[error("Response from `{0}` contained no content")]
    EmptyResponse(String),
    /// The response content did not describe a judgment.
    #[error(transparent)]
    Malformed(#[from] JudgmentError),
}

/// Reasons a raw response cannot be turned into a judgment.
#[derive(thiserror::Error, Debug)]
pub enum JudgmentError {
    /// No JSON object could be located in the text.
    #[error("No JSON object found in response")]
    NoJson,
    /// The JSON object was syntactically invalid.
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),
    /// The JSON had no recognisable per-section scores.
    #[error("Response has no `sections` entry")]
    MissingSections,
}

/// Errors from the manual edit-and-recompute path.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EditError {
    /// The edit names a section the record does not have.
    #[error("Grade for `{student_id}` has no section named `{section}`.")]
    UnknownSection {
        /// Student whose record was edited.
        student_id: String,
        /// Section name supplied by the edit.
        section:    String,
    },
    /// The edit supplied a non-finite score.
    #[error("Points for `{0}` must be a finite number.")]
    InvalidPoints(String),
}
