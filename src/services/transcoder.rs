use crate::services::media_tool::{ToolError, run_tool};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("transcoder produced no output at {0}")]
    MissingOutput(String),
}

impl TranscodeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TranscodeError::Tool(e) if e.is_cancelled())
    }
}

/// Rewrites a container so its index sits ahead of the media data.
///
/// Streams are copied, never re-encoded. `input` is left untouched; `output`
/// may be partially written on failure and is owned by the caller.
#[async_trait]
pub trait FastStartTranscoder: Send + Sync {
    async fn fast_start(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError>;
}

/// `FastStartTranscoder` backed by the ffmpeg binary.
pub struct FfmpegFastStart {
    program: String,
}

impl FfmpegFastStart {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl FastStartTranscoder for FfmpegFastStart {
    async fn fast_start(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError> {
        run_tool(
            &self.program,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-movflags"),
                OsStr::new("faststart"),
                OsStr::new("-f"),
                OsStr::new("mp4"),
                output.as_os_str(),
            ],
            cancel,
        )
        .await?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(TranscodeError::MissingOutput(output.display().to_string()));
        }

        Ok(())
    }
}
