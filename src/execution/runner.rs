#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use bon::Builder;

use super::{ExecutionAdapter, ExecutionResult, junit::read_junit_report};
use crate::{
    constants::{
        ANSWERS_FILENAME, EXECUTION_TIMEOUT_SECS, POSSIBLE_ANSWERS_FILENAMES,
        TEACHER_ANSWERS_FILENAME, TEST_REPORT_FILENAME, TESTS_DIRNAME,
    },
    error::GraderError,
    process::{RunOutcome, run_collect},
    submission::find_answers_file,
    util::{python_path, replace_dir},
};

/// Runs pytest directly on the host. Provides no isolation.
#[derive(Debug, Clone, Builder)]
pub struct LocalRunner {
    /// Wall-clock limit for one suite, in seconds.
    #[builder(default = EXECUTION_TIMEOUT_SECS)]
    timeout_secs:  u64,
    /// Shared tests copied into every submission as `tests/`.
    tests_dir:     Option<PathBuf>,
    /// Test data copied into every submission under its own directory name.
    test_data_dir: Option<PathBuf>,
    /// Interpreter to use instead of looking one up on the path.
    python:        Option<PathBuf>,
}

impl LocalRunner {
    /// Wall-clock limit for one suite, in seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Copies shared tests and test data into the submission.
    fn stage_fixtures(&self, submission: &Path) -> Result<()> {
        if let Some(tests) = self.tests_dir.as_deref()
            && tests.is_dir()
        {
            replace_dir(tests, &submission.join(TESTS_DIRNAME))?;
        }

        if let Some(data) = self.test_data_dir.as_deref()
            && data.is_dir()
            && let Some(name) = data.file_name()
        {
            replace_dir(data, &submission.join(name))?;
        }

        Ok(())
    }

    /// pytest arguments, relative to the submission directory.
    fn pytest_args() -> Vec<OsString> {
        [
            "-m".to_string(),
            "pytest".to_string(),
            format!("{TESTS_DIRNAME}/"),
            format!("--junitxml={TEST_REPORT_FILENAME}"),
            "-v".to_string(),
            "--tb=short".to_string(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    /// `PYTHONPATH` with the submission prepended to whatever is inherited.
    fn python_path_env(submission: &Path) -> Result<OsString> {
        let mut paths = vec![submission.to_path_buf()];
        if let Some(existing) = std::env::var_os("PYTHONPATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        std::env::join_paths(paths).context("Could not build PYTHONPATH")
    }

    /// Everything after the answers file check; errors become a failed
    /// result in [`ExecutionAdapter::run`].
    async fn execute(&self, submission: &Path) -> Result<ExecutionResult> {
        let submission = submission
            .canonicalize()
            .with_context(|| format!("Could not resolve {}", submission.display()))?;

        self.stage_fixtures(&submission)?;

        let answers = submission.join(ANSWERS_FILENAME);
        let teacher_answers = submission.join(TEACHER_ANSWERS_FILENAME);
        if !answers.exists() && teacher_answers.exists() {
            std::fs::copy(&teacher_answers, &answers).with_context(|| {
                format!("Could not copy {} to {}", teacher_answers.display(), answers.display())
            })?;
        }

        let report = submission.join(TEST_REPORT_FILENAME);
        if report.exists() {
            std::fs::remove_file(&report)
                .with_context(|| format!("Could not remove stale {}", report.display()))?;
        }

        let python = python_path(self.python.as_deref())?;
        let env = vec![("PYTHONPATH".into(), Self::python_path_env(&submission)?)];
        tracing::debug!(
            "Executing {:?} {:?} in {}",
            python,
            Self::pytest_args(),
            submission.display()
        );

        let outcome = run_collect(
            &python,
            &Self::pytest_args(),
            Some(&submission),
            &env,
            Some(Duration::from_secs(self.timeout_secs)),
        )
        .await?;

        match outcome {
            RunOutcome::TimedOut => Ok(ExecutionResult::timed_out(self.timeout_secs)),
            RunOutcome::Finished(collected) => {
                let exit_code = collected.exit_code();
                Ok(ExecutionResult {
                    success: exit_code == 0,
                    exit_code,
                    timeout_exceeded: false,
                    setup_log: "Local environment used".to_string(),
                    test_log: collected.combined_output(),
                    tests: read_junit_report(&report),
                })
            }
        }
    }
}

impl ExecutionAdapter for LocalRunner {
    async fn run(&self, submission: &Path) -> ExecutionResult {
        if !submission.is_dir() {
            return ExecutionResult::failed(format!(
                "Submission path not found: {}",
                submission.display()
            ));
        }

        if find_answers_file(submission).is_none() {
            let err = GraderError::SubmissionIncomplete {
                path:     submission.to_path_buf(),
                expected: POSSIBLE_ANSWERS_FILENAMES
                    .iter()
                    .map(|f| format!("'{f}'"))
                    .collect::<Vec<_>>()
                    .join(" or "),
            };
            return ExecutionResult::failed(err.to_string());
        }

        match self.execute(submission).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::failed(format!("Local execution error: {e:#}")),
        }
    }
}
