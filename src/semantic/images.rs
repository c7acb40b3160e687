#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;

use super::{ImageDescription, SemanticGrader};
use crate::constants::IMAGE_EXTENSIONS;

/// `![caption](target)`
static IMAGE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("image link regex"));

/// An image referenced from a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLink {
    /// Link target as written.
    pub target:  String,
    /// Alt text.
    pub caption: String,
}

/// Markdown image links whose target has an image extension, in document
/// order.
pub fn extract_image_links(report: &str) -> Vec<ImageLink> {
    IMAGE_LINK
        .captures_iter(report)
        .filter_map(|caps| {
            let target = caps[2].trim().to_string();
            let lower = target.to_lowercase();
            IMAGE_EXTENSIONS
                .iter()
                .any(|ext| lower.ends_with(ext))
                .then(|| ImageLink {
                    target,
                    caption: caps[1].to_string(),
                })
        })
        .collect()
}

/// Locates a link target inside `submission`, falling back to its bare file
/// name.
pub fn resolve_image(submission: &Path, target: &str) -> Option<PathBuf> {
    let direct = submission.join(target.trim_start_matches("./"));
    if direct.is_file() {
        return Some(direct);
    }

    let by_name = submission.join(Path::new(target).file_name()?);
    by_name.is_file().then_some(by_name)
}

/// Describes every image the report links to. Missing files are logged and
/// skipped.
pub async fn describe_report_images<G: SemanticGrader>(
    grader: &G,
    student_id: &str,
    submission: &Path,
    report: &str,
) -> Vec<ImageDescription> {
    let links = extract_image_links(report);
    if !links.is_empty() {
        tracing::info!(student = student_id, "Analyzing {} images from report", links.len());
    }

    let mut descriptions = Vec::with_capacity(links.len());
    for link in links {
        match resolve_image(submission, &link.target) {
            Some(path) => {
                tracing::debug!(student = student_id, "Describing {}", path.display());
                descriptions.push(grader.describe_image(&path, &link.caption).await);
            }
            None => {
                tracing::warn!(student = student_id, "Image file not found: {}", link.target);
            }
        }
    }

    descriptions
}
