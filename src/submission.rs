#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Discovery of student submission directories.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result};
use regex::Regex;

use crate::constants::{POSSIBLE_ANSWERS_FILENAMES, REPORT_FILENAME, TESTS_DIRNAME};

/// `owner/name` in an HTTPS or SSH GitHub remote URL.
static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/]([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?\s*$")
        .expect("github remote regex")
});

/// A student's submission directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Directory name.
    pub student_id:   String,
    /// Absolute path to the directory.
    pub path:         PathBuf,
    /// The required source file, if present.
    pub answers_file: Option<PathBuf>,
    /// Report text, if present.
    pub report:       Option<String>,
    /// `owner/name` of the GitHub remote, if any.
    pub github_repo:  Option<String>,
}

impl Submission {
    /// Inspects one submission directory.
    ///
    /// The student id is the directory's own name, even when the entry is a
    /// link to a directory named differently.
    pub fn load(path: &Path) -> Result<Self> {
        let resolved = path
            .canonicalize()
            .with_context(|| format!("Could not resolve {}", path.display()))?;
        let student_id = path
            .file_name()
            .or_else(|| resolved.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no directory name", path.display()))?;
        let path = resolved;

        let report_path = path.join(REPORT_FILENAME);
        let report = if report_path.is_file() {
            match fs::read_to_string(&report_path) {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!(student = %student_id, "Could not read report: {e}");
                    Some("[Error reading report]".to_string())
                }
            }
        } else {
            None
        };

        Ok(Self {
            answers_file: find_answers_file(&path),
            github_repo: detect_github_repo(&path),
            student_id,
            path,
            report,
        })
    }
}

/// First of the accepted answers file names present in `dir`.
pub fn find_answers_file(dir: &Path) -> Option<PathBuf> {
    POSSIBLE_ANSWERS_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Reads `owner/name` from the `url` of the first GitHub remote in
/// `.git/config`.
pub fn detect_github_repo(dir: &Path) -> Option<String> {
    let config = fs::read_to_string(dir.join(".git").join("config")).ok()?;
    parse_github_remote(&config)
}

/// Extracts `owner/name` from git config text.
pub fn parse_github_remote(config: &str) -> Option<String> {
    config
        .lines()
        .filter_map(|line| line.trim().strip_prefix("url"))
        .filter_map(|rest| rest.trim_start().strip_prefix('='))
        .find_map(|url| {
            let caps = GITHUB_REMOTE.captures(url.trim())?;
            Some(format!("{}/{}", &caps[1], &caps[2]))
        })
}

/// Every submission under `root`, sorted by directory name.
///
/// Hidden directories, `__pycache__` and `tests` are not submissions.
pub fn find_submissions(root: &Path) -> Result<Vec<Submission>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("Could not read submissions directory {}", root.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| {
                    !name.starts_with('.') && name != "__pycache__" && name != TESTS_DIRNAME
                })
        })
        .collect();
    dirs.sort();

    Ok(load_submissions(&dirs))
}

/// Loads each directory, skipping with a warning any that cannot be read.
pub fn load_submissions(dirs: &[PathBuf]) -> Vec<Submission> {
    dirs.iter()
        .filter_map(|dir| match Submission::load(dir) {
            Ok(submission) => Some(submission),
            Err(e) => {
                let student = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| dir.display().to_string());
                tracing::warn!(student = %student, "Skipping submission: {e:#}");
                None
            }
        })
        .collect()
}
