//! Upload processing: stage, probe, transcode, upload, reference, persist.
//!
//! Both local files live in [`TempPath`]s owned by the run, so every exit
//! path (success, error, cancellation, or the future being dropped) removes
//! them. Persistence is the final step; a failure anywhere earlier leaves the
//! video record untouched.

use crate::config::AppConfig;
use crate::models::Video;
use crate::services::probe::{MediaProbe, ProbeError};
use crate::services::reference::{ReferenceError, StoredReference};
use crate::services::storage::{ObjectStore, StorageError};
use crate::services::transcoder::{FastStartTranscoder, TranscodeError};
use crate::services::video_repository::{RepositoryError, VideoRepository};
use crate::utils::keys::object_key;
use crate::utils::validation::{
    ValidationError, media_type_to_extension, validate_upload_size, validate_video_content_type,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Staged,
    Probed,
    Transcoded,
    Uploaded,
    Referenced,
    Persisted,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Staged => "staged",
            PipelineStage::Probed => "probed",
            PipelineStage::Transcoded => "transcoded",
            PipelineStage::Uploaded => "uploaded",
            PipelineStage::Referenced => "referenced",
            PipelineStage::Persisted => "persisted",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("video {0} not found")]
    VideoNotFound(Uuid),

    #[error("couldn't retrieve video metadata: {0}")]
    Lookup(#[source] RepositoryError),

    #[error("user {user_id} is not authorized to update video {video_id}")]
    NotOwner { video_id: Uuid, user_id: Uuid },

    #[error("couldn't stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error("couldn't probe video: {0}")]
    Probe(#[source] ProbeError),

    #[error("couldn't complete fast-start processing: {0}")]
    Transcode(#[source] TranscodeError),

    #[error("couldn't upload video: {0}")]
    Store(#[source] StorageError),

    #[error("couldn't build stored reference: {0}")]
    Reference(#[source] ReferenceError),

    #[error("couldn't update video: {0}")]
    Persistence(#[source] RepositoryError),

    #[error("upload cancelled before reaching {0}")]
    Cancelled(PipelineStage),
}

impl PipelineError {
    /// The stage the run was trying to reach when it failed.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Validation(ValidationError::TooLarge { .. }) => PipelineStage::Staged,
            PipelineError::Validation(_)
            | PipelineError::VideoNotFound(_)
            | PipelineError::Lookup(_)
            | PipelineError::NotOwner { .. } => PipelineStage::Received,
            PipelineError::Staging(_) => PipelineStage::Staged,
            PipelineError::Probe(_) => PipelineStage::Probed,
            PipelineError::Transcode(_) => PipelineStage::Transcoded,
            PipelineError::Store(_) => PipelineStage::Uploaded,
            PipelineError::Reference(_) => PipelineStage::Referenced,
            PipelineError::Persistence(_) => PipelineStage::Persisted,
            PipelineError::Cancelled(stage) => *stage,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(ValidationError::TooLarge { .. }) => "payload_too_large",
            PipelineError::Validation(_) => "validation_error",
            PipelineError::VideoNotFound(_) => "not_found",
            PipelineError::Lookup(_) | PipelineError::Persistence(_) => "persistence_error",
            PipelineError::NotOwner { .. } => "authorization_error",
            PipelineError::Staging(_) => "internal_error",
            PipelineError::Probe(_) => "probe_error",
            PipelineError::Transcode(_) => "transcode_error",
            PipelineError::Store(_) => "store_error",
            PipelineError::Reference(_) => "reference_format_error",
            PipelineError::Cancelled(_) => "cancelled",
        }
    }
}

/// Client-submitted bytes plus their declared content type.
pub struct RawUpload<R> {
    pub content_type: Option<String>,
    pub body: R,
}

pub struct UploadRequest<R> {
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub upload: RawUpload<R>,
}

pub struct VideoPipeline {
    config: AppConfig,
    probe: Arc<dyn MediaProbe>,
    transcoder: Arc<dyn FastStartTranscoder>,
    store: Arc<dyn ObjectStore>,
    repo: Arc<dyn VideoRepository>,
}

impl VideoPipeline {
    pub fn new(
        config: AppConfig,
        probe: Arc<dyn MediaProbe>,
        transcoder: Arc<dyn FastStartTranscoder>,
        store: Arc<dyn ObjectStore>,
        repo: Arc<dyn VideoRepository>,
    ) -> Self {
        Self {
            config,
            probe,
            transcoder,
            store,
            repo,
        }
    }

    /// Runs one upload to completion and returns the updated record.
    pub async fn process_upload<R>(
        &self,
        request: UploadRequest<R>,
        cancel: &CancellationToken,
    ) -> Result<Video, PipelineError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let UploadRequest {
            video_id,
            user_id,
            upload,
        } = request;
        let start = Instant::now();
        let bucket = self.config.s3_bucket.as_str();

        // Received
        let media_type = validate_video_content_type(
            upload.content_type.as_deref(),
            &self.config.allowed_video_types,
        )?;

        let mut video = self
            .repo
            .get_video(video_id)
            .await
            .map_err(PipelineError::Lookup)?
            .ok_or(PipelineError::VideoNotFound(video_id))?;

        if video.user_id != user_id {
            return Err(PipelineError::NotOwner { video_id, user_id });
        }

        info!(video_id = %video_id, user_id = %user_id, media_type = %media_type, "Uploading video");

        // Staged
        let (staged, size) = self.stage(upload.body, &media_type, cancel).await?;
        debug!(video_id = %video_id, stage = %PipelineStage::Staged, size_bytes = size, path = %staged.display(), "Upload staged");

        // Probed
        let aspect = self
            .probe
            .probe(&staged, cancel)
            .await
            .and_then(|output| output.aspect_class())
            .map_err(|e| {
                if e.is_cancelled() {
                    PipelineError::Cancelled(PipelineStage::Probed)
                } else {
                    PipelineError::Probe(e)
                }
            })?;
        debug!(video_id = %video_id, stage = %PipelineStage::Probed, aspect = %aspect, "Video probed");

        // Transcoded: owned before the tool runs so partial output is removed too
        let processed = TempPath::from_path(processing_path(&staged));
        self.transcoder
            .fast_start(&staged, &processed, cancel)
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    PipelineError::Cancelled(PipelineStage::Transcoded)
                } else {
                    PipelineError::Transcode(e)
                }
            })?;
        debug!(video_id = %video_id, stage = %PipelineStage::Transcoded, "Fast-start processing complete");

        // Uploaded
        let key = object_key(aspect, &media_type);
        self.store
            .put_file(bucket, &key, &processed, &media_type, cancel)
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    PipelineError::Cancelled(PipelineStage::Uploaded)
                } else {
                    PipelineError::Store(e)
                }
            })?;
        debug!(video_id = %video_id, stage = %PipelineStage::Uploaded, bucket = %bucket, key = %key, "Video stored");

        // Referenced
        let reference = StoredReference::new(bucket, key.as_str()).map_err(PipelineError::Reference)?;

        // Persisted
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled(PipelineStage::Persisted));
        }
        video.video_url = Some(reference.encode());
        let video = self
            .repo
            .update_video(&video)
            .await
            .map_err(PipelineError::Persistence)?;

        info!(
            video_id = %video_id,
            user_id = %user_id,
            stage = %PipelineStage::Persisted,
            bucket = %bucket,
            key = %key,
            aspect = %aspect,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video upload complete"
        );

        Ok(video)
    }

    /// Copies the body into a fresh temp file, enforcing the size limit.
    async fn stage<R>(
        &self,
        mut body: R,
        media_type: &str,
        cancel: &CancellationToken,
    ) -> Result<(TempPath, u64), PipelineError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let temp_dir = self.config.temp_dir();
        let suffix = media_type_to_extension(media_type);
        let staged = tempfile::Builder::new()
            .prefix("video-upload-")
            .suffix(&suffix)
            .tempfile_in(&temp_dir)
            .map_err(PipelineError::Staging)?;
        let (file, path) = staged.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let max_size = self.config.max_upload_size;

        let copy = async {
            let mut buffer = vec![0u8; 64 * 1024];
            let mut total_size: usize = 0;

            loop {
                let n = body
                    .read(&mut buffer)
                    .await
                    .map_err(PipelineError::Staging)?;
                if n == 0 {
                    break;
                }
                total_size += n;
                validate_upload_size(total_size, max_size)?;
                file.write_all(&buffer[..n])
                    .await
                    .map_err(PipelineError::Staging)?;
            }
            file.flush().await.map_err(PipelineError::Staging)?;

            Ok::<_, PipelineError>(total_size as u64)
        };

        let size = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled(PipelineStage::Staged)),
            size = copy => size?,
        };

        Ok((path, size))
    }
}

/// Sibling of the staged file that receives the fast-start output.
fn processing_path(staged: &Path) -> PathBuf {
    let mut path = staged.as_os_str().to_owned();
    path.push(".processing");
    PathBuf::from(path)
}
