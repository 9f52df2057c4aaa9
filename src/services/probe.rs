use crate::services::media_tool::{ToolError, run_tool};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

/// Coarse aspect-ratio bucket used as the object key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Truncating integer division against 16:9, then 9:16.
    pub fn classify(width: u32, height: u32) -> Self {
        if width / 16 == height / 9 {
            AspectClass::Landscape
        } else if width / 9 == height / 16 {
            AspectClass::Portrait
        } else {
            AspectClass::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("unparseable probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("probe output contains no streams")]
    NoStreams,

    #[error("no stream reports width and height")]
    MissingDimensions,
}

impl ProbeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProbeError::Tool(e) if e.is_cancelled())
    }
}

/// Subset of `ffprobe -print_format json -show_streams` output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl ProbeOutput {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProbeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Width and height of the first video stream.
    ///
    /// Streams without a `codec_type` are accepted if they carry both
    /// dimensions, matching tools that only emit geometry.
    pub fn video_dimensions(&self) -> Result<(u32, u32), ProbeError> {
        if self.streams.is_empty() {
            return Err(ProbeError::NoStreams);
        }

        let dims = |s: &ProbeStream| s.width.zip(s.height);

        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .and_then(dims)
            .or_else(|| {
                self.streams
                    .iter()
                    .filter(|s| s.codec_type.as_deref().is_none_or(|t| t == "video"))
                    .find_map(dims)
            })
            .ok_or(ProbeError::MissingDimensions)
    }

    pub fn aspect_class(&self) -> Result<AspectClass, ProbeError> {
        let (width, height) = self.video_dimensions()?;
        Ok(AspectClass::classify(width, height))
    }
}

/// Inspects a local media file and reports its streams.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutput, ProbeError>;
}

/// `MediaProbe` backed by the ffprobe binary.
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutput, ProbeError> {
        let stdout = run_tool(
            &self.program,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-print_format"),
                OsStr::new("json"),
                OsStr::new("-show_streams"),
                path.as_os_str(),
            ],
            cancel,
        )
        .await?;

        ProbeOutput::from_json(&stdout)
    }
}
