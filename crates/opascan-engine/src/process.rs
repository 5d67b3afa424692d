//! Child process execution for `opa` subcommands.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

/// Captured result of one `opa` invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} timed out after {secs} seconds")]
    TimedOut { binary: String, secs: u64 },

    #[error("failed waiting for {binary}: {source}")]
    Wait {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run `binary args..` to completion, killing it if `timeout_secs` elapses.
///
/// A zero timeout waits indefinitely. The child is also killed when the
/// returned future is dropped.
pub async fn run(
    binary: &str,
    args: &[OsString],
    timeout_secs: u64,
) -> Result<ProcessOutput, ProcessError> {
    let start = Instant::now();

    let child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            binary: binary.to_string(),
            source,
        })?;

    let wait = child.wait_with_output();
    let waited = if timeout_secs > 0 {
        tokio::time::timeout(Duration::from_secs(timeout_secs), wait)
            .await
            .map_err(|_| ProcessError::TimedOut {
                binary: binary.to_string(),
                secs: timeout_secs,
            })?
    } else {
        wait.await
    };
    let output = waited.map_err(|source| ProcessError::Wait {
        binary: binary.to_string(),
        source,
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = output.status.code().unwrap_or(-1);
    debug!(binary = %binary, exit_code, duration_ms, "Process finished");

    Ok(ProcessOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms,
    })
}
