//! Bounded execution of external media tools (ffprobe, ffmpeg).

use std::{
    ffi::OsStr,
    io,
    process::{ExitStatus, Output, Stdio},
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Run `program` to completion and capture its output.
///
/// The child is killed if it outlives `timeout`. A non-zero exit is an error
/// carrying the (trimmed) stderr.
pub async fn run_tool<I, S>(program: &str, args: I, timeout: Duration) -> Result<Output, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = ?cmd.as_std(), "running external tool");
    let started = Instant::now();

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            warn!(program, timeout_secs = timeout.as_secs(), "external tool timed out");
            return Err(ProcessError::TimedOut {
                program: program.to_string(),
                timeout,
            });
        }
    };

    debug!(
        program,
        status = %output.status,
        duration_ms = started.elapsed().as_millis() as u64,
        "external tool finished"
    );

    if !output.status.success() {
        return Err(ProcessError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let output = run_tool("sh", ["-c", "printf hello"], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout, b"hello");
    }

    #[tokio::test]
    async fn non_zero_exit_is_failed() {
        let err = run_tool("sh", ["-c", "echo boom >&2; exit 3"], Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ProcessError::Failed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let err = run_tool(
            "definitely-not-a-real-binary-tubely",
            ["x"],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let err = run_tool("sleep", ["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::TimedOut { .. }));
    }
}
