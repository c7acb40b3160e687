#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Subprocess spawning with captured output and a wall-clock limit.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Stdio,
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncRead, AsyncReadExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};

/// Kills the wrapped child when dropped, unless disarmed first.
///
/// A timed out wait future is dropped mid-flight, which is what actually
/// terminates a runaway test suite.
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Takes ownership of `child`.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Borrows the wrapped child.
    fn child_mut(&mut self) -> Result<&mut Child> {
        self.0
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Leaves the child alone on drop.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: std::process::ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Exit code, or `-1` when the process was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Stdout and stderr decoded lossily and joined.
    pub fn combined_output(&self) -> String {
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stderr = String::from_utf8_lossy(&self.stderr);
        if stderr.trim().is_empty() {
            stdout.into_owned()
        } else {
            format!("{stdout}\n{stderr}")
        }
    }
}

/// How a subprocess run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The process exited on its own.
    Finished(Collected),
    /// The deadline elapsed and the process was killed.
    TimedOut,
}

/// Reads a pipe to the end on its own task.
fn drain<R>(pipe: R, label: &'static str) -> JoinHandle<Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .with_context(|| format!("failed to read {label}"))?;
        Ok(buf)
    })
}

/// Spawns `program` with a null stdin and collects its stdout and stderr.
///
/// Spawn and I/O failures are errors; running past `deadline` is not, it is
/// reported as [`RunOutcome::TimedOut`].
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    cwd: Option<&Path>,
    env: &[(OsString, OsString)],
    deadline: Option<Duration>,
) -> Result<RunOutcome> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    let mut guard = ChildDropGuard::new(cmd.spawn().context("failed to spawn process")?);

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;
    let out_task = drain(stdout, "stdout");
    let err_task = drain(stderr, "stderr");

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        guard.disarm();
        Ok(Collected {
            status,
            stdout,
            stderr,
        })
    };

    match deadline {
        Some(limit) => match timeout(limit, wait_future).await {
            Ok(collected) => collected.map(RunOutcome::Finished),
            Err(_) => Ok(RunOutcome::TimedOut),
        },
        None => wait_future.await.map(RunOutcome::Finished),
    }
}
