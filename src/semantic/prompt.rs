#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Write as _;

use itertools::Itertools;

use super::{ImageDescription, JudgmentRequest};
use crate::{
    constants::{REPORT_TRUNCATE, SETUP_LOG_TRUNCATE, TEST_ERROR_TRUNCATE, TEST_LOG_TRUNCATE},
    execution::ExecutionResult,
    util::{truncate_chars, truncate_with_ellipsis},
};

/// System message for grading requests.
pub const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");

/// Output contract appended to every grading request.
pub const RESPONSE_FORMAT: &str = include_str!("prompts/response_format.md");

/// System message for image description requests.
pub const DESCRIBE_IMAGE_PROMPT: &str = include_str!("prompts/describe_image.md");

/// Returns `text` cut to `limit` characters, or `placeholder` when empty.
fn or_placeholder<'a>(text: &'a str, limit: usize, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        truncate_chars(text, limit)
    }
}

/// Per-test summary for the grading prompt.
pub fn format_test_results(execution: &ExecutionResult) -> String {
    if execution.tests.is_empty() {
        return if execution.success {
            "No detailed test results available, but execution completed successfully.".into()
        } else {
            "No detailed test results available. Execution may have failed before tests could run."
                .into()
        };
    }

    let total = execution.tests.len();
    let passed = execution.passed_count();
    let mut out = format!("Total: {total} tests, {passed} passed, {} failed\n", total - passed);

    for test in &execution.tests {
        let status = if test.passed { "PASSED" } else { "FAILED" };
        let _ = write!(out, "\n- {}: {status}", test.test_name);
        if !test.passed
            && let Some(error) = test.error_message.as_deref()
            && !error.is_empty()
        {
            let _ = write!(
                out,
                "\n  Error: {}",
                truncate_with_ellipsis(error, TEST_ERROR_TRUNCATE)
            );
        }
    }

    out
}

/// Figure descriptions for the grading prompt.
pub fn format_images(images: &[ImageDescription]) -> String {
    if images.is_empty() {
        return "No images found in report or analyzed.".into();
    }

    images
        .iter()
        .map(|image| {
            let caption = if image.caption.is_empty() {
                String::new()
            } else {
                format!(" (Caption: {})", image.caption)
            };
            format!("### Figure: {}{caption}\nDescription: {}\n", image.filename, image.description)
        })
        .join("\n")
}

/// Builds the user message for one grading request.
pub fn build_user_prompt(request: &JudgmentRequest<'_>) -> String {
    let execution = request.execution;
    let section_names = request
        .rubric
        .sections()
        .iter()
        .map(|s| format!("\"{}\"", s.name()))
        .join(", ");

    format!(
        r#"# GRADING TASK

## Assignment Rubric
{rubric}

## Code Execution Results (Deterministic Tests)

### Setup Log:
```
{setup}
```

### Test Execution Log:
```
{tests}
```

### Test Summary:
{summary}

### Overall Execution Status:
- Success: {success}
- Exit Code: {exit_code}
- Timeout Exceeded: {timeout}

## Student Report (report.md):
```markdown
{report}
```

## Figure Descriptions (from student images):
{images}

## Instructions

Grade this submission according to the rubric above. For each section ({section_names}), give the points earned (out of that section's maximum) and specific feedback explaining the grade.

Consider:
- Whether the tests passed. This is ground truth for code correctness.
- Whether the report demonstrates understanding of the concepts.
- Whether the report is complete and well written.
- For visualization sections, whether figures are present and referenced in the report.

Close with overall feedback that is constructive and helps the student improve.

{format}"#,
        rubric = request.rubric.to_prompt_text(),
        setup = or_placeholder(&execution.setup_log, SETUP_LOG_TRUNCATE, "No setup log available"),
        tests = or_placeholder(&execution.test_log, TEST_LOG_TRUNCATE, "No test log available"),
        summary = format_test_results(execution),
        success = execution.success,
        exit_code = execution.exit_code,
        timeout = execution.timeout_exceeded,
        report = or_placeholder(
            request.report.unwrap_or_default(),
            REPORT_TRUNCATE,
            "NO REPORT SUBMITTED"
        ),
        images = format_images(request.images),
        format = RESPONSE_FORMAT,
    )
}

/// Builds the text part of an image description request.
pub fn image_prompt(caption: &str) -> String {
    if caption.is_empty() {
        "Please describe this image.".to_string()
    } else {
        format!("Please describe this image. It has the following caption: {caption}")
    }
}
