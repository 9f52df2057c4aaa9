//! Runs external media binaries (ffprobe, ffmpeg) as child processes.
//!
//! Children are spawned with `kill_on_drop`, so dropping the future or
//! cancelling the token terminates the process.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

impl ToolError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }
}

/// Runs `program` with `args` to completion and returns its stdout.
pub async fn run_tool<I, S>(
    program: &str,
    args: I,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(program = %program, "Cancelling media tool");
            return Err(ToolError::Cancelled { program: program.to_string() });
        }
        output = child.wait_with_output() => output.map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::error!(program = %program, status = %output.status, "{} failed: {}", program, stderr);
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr,
        });
    }

    Ok(output.stdout)
}
