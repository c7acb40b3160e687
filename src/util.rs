#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;
use which::which;

/// Finds and returns the path to a Python interpreter.
///
/// An explicitly configured interpreter wins; otherwise `python3` and then
/// `python` are looked up on the path.
pub fn python_path(configured: Option<&Path>) -> Result<OsString> {
    if let Some(path) = configured {
        return Ok(path.as_os_str().to_owned());
    }

    which("python3")
        .or_else(|_| which("python"))
        .map(PathBuf::into_os_string)
        .context("Cannot find a Python interpreter on path (python3 or python)")
}

/// A glob utility function to find paths to files with certain extension
///
/// * `extension`: the file extension to find paths for
/// * `search_depth`: how many folders deep to search for
/// * `root_dir`: the root directory where search starts
pub fn find_files(extension: &str, search_depth: i8, root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pattern = root_dir.to_path_buf();

    for _ in 0..search_depth {
        pattern.push("**");
    }

    pattern.push(format!("*.{extension}"));
    let pattern = pattern
        .to_str()
        .context("Could not convert root_dir to string")?
        .to_string();

    let mut found: Vec<PathBuf> = glob(&pattern)
        .context("Could not create glob")?
        .filter_map(Result::ok)
        .collect();
    found.sort();
    Ok(found)
}

/// Recursively copies `src` into `dst`, replacing whatever `dst` held.
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        fs::remove_dir_all(dst).with_context(|| format!("Could not delete {}", dst.display()))?;
    }

    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("Could not walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("Walked entry escaped its root")?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Could not create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Could not copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }

    Ok(())
}

/// Returns at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Like [`truncate_chars`], but appends `...` when something was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

/// Writes `value` as pretty-printed JSON to `path`.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("Could not serialize {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("Could not write {}", path.display()))
}
