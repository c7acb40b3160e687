#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Deterministic test execution for one submission.

/// JUnit XML report parsing.
pub mod junit;
/// Runs pytest on the host machine.
pub mod runner;

use std::{future::Future, path::Path};

use serde::{Deserialize, Serialize};

pub use runner::LocalRunner;

/// Outcome of a single test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test function name.
    pub test_name:        String,
    /// Whether the test passed. Skipped tests count as passed.
    pub passed:           bool,
    /// Failure or error text, if the test did not pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message:    Option<String>,
    /// Wall time reported for the test, in seconds.
    #[serde(default)]
    pub duration_seconds: f64,
}

/// Everything learned from running a submission's test suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the suite ran to completion with a zero exit code.
    pub success:          bool,
    /// Process exit code, `-1` when the suite never produced one.
    pub exit_code:        i32,
    /// Whether the wall-clock limit was hit.
    #[serde(default)]
    pub timeout_exceeded: bool,
    /// Environment preparation output or diagnostics.
    #[serde(default)]
    pub setup_log:        String,
    /// Combined pytest stdout and stderr.
    #[serde(default)]
    pub test_log:         String,
    /// Per-test outcomes in report order.
    #[serde(default)]
    pub tests:            Vec<TestResult>,
}

impl ExecutionResult {
    /// A result that never reached the test suite.
    pub fn failed(setup_log: impl Into<String>) -> Self {
        Self {
            success:          false,
            exit_code:        -1,
            timeout_exceeded: false,
            setup_log:        setup_log.into(),
            test_log:         String::new(),
            tests:            Vec::new(),
        }
    }

    /// A result for a suite killed after `secs` seconds.
    pub fn timed_out(secs: u64) -> Self {
        Self {
            timeout_exceeded: true,
            ..Self::failed(format!("Execution timed out after {secs} seconds"))
        }
    }

    /// Number of passing tests.
    pub fn passed_count(&self) -> usize {
        self.tests.iter().filter(|t| t.passed).count()
    }
}

/// Runs a submission's test suite.
///
/// Implementations never fail: faults are reported through
/// [`ExecutionResult::success`] and the logs.
pub trait ExecutionAdapter {
    /// Executes the tests for the submission at `submission`.
    fn run(&self, submission: &Path) -> impl Future<Output = ExecutionResult> + Send;
}
