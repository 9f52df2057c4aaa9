#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_video_backend::config::AppConfig;
use rust_video_backend::models::Video;
use rust_video_backend::services::media_tool::ToolError;
use rust_video_backend::services::probe::{MediaProbe, ProbeError, ProbeOutput};
use rust_video_backend::services::storage::{ObjectStore, PresignedUrl, StorageError};
use rust_video_backend::services::transcoder::{FastStartTranscoder, TranscodeError};
use rust_video_backend::services::video_pipeline::VideoPipeline;
use rust_video_backend::services::video_repository::{RepositoryError, VideoRepository};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const LANDSCAPE_720P: &str = r#"{"streams":[{"index":0,"codec_type":"video","width":1280,"height":720}]}"#;
pub const PORTRAIT_1080P: &str = r#"{"streams":[{"index":0,"codec_type":"video","width":1080,"height":1920}]}"#;

/// Bytes standing in for an uploaded container.
pub const SAMPLE_VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42not-really-a-video";

/// Returns fixed ffprobe JSON.
pub struct CannedProbe {
    json: String,
}

impl CannedProbe {
    pub fn new(json: &str) -> Self {
        Self {
            json: json.to_string(),
        }
    }
}

#[async_trait]
impl MediaProbe for CannedProbe {
    async fn probe(
        &self,
        path: &Path,
        _cancel: &CancellationToken,
    ) -> Result<ProbeOutput, ProbeError> {
        assert!(path.exists(), "probe called on a missing file");
        ProbeOutput::from_json(self.json.as_bytes())
    }
}

/// Blocks until the run is cancelled.
pub struct BlockingProbe;

#[async_trait]
impl MediaProbe for BlockingProbe {
    async fn probe(
        &self,
        _path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutput, ProbeError> {
        cancel.cancelled().await;
        Err(ProbeError::Tool(ToolError::Cancelled {
            program: "ffprobe".to_string(),
        }))
    }
}

/// Copies input to output unchanged.
pub struct CopyingTranscoder;

#[async_trait]
impl FastStartTranscoder for CopyingTranscoder {
    async fn fast_start(
        &self,
        input: &Path,
        output: &Path,
        _cancel: &CancellationToken,
    ) -> Result<(), TranscodeError> {
        tokio::fs::copy(input, output)
            .await
            .map_err(|_| TranscodeError::MissingOutput(output.display().to_string()))?;
        Ok(())
    }
}

/// Writes part of the output, then fails.
pub struct PartialWriteTranscoder;

#[async_trait]
impl FastStartTranscoder for PartialWriteTranscoder {
    async fn fast_start(
        &self,
        _input: &Path,
        output: &Path,
        _cancel: &CancellationToken,
    ) -> Result<(), TranscodeError> {
        tokio::fs::write(output, b"half a moov atom")
            .await
            .map_err(|_| TranscodeError::MissingOutput(output.display().to_string()))?;
        Err(TranscodeError::MissingOutput(output.display().to_string()))
    }
}

/// Writes part of the output, then waits for cancellation like a killed ffmpeg.
pub struct BlockingTranscoder;

#[async_trait]
impl FastStartTranscoder for BlockingTranscoder {
    async fn fast_start(
        &self,
        _input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError> {
        tokio::fs::write(output, b"half a moov atom")
            .await
            .map_err(|_| TranscodeError::MissingOutput(output.display().to_string()))?;
        cancel.cancelled().await;
        Err(TranscodeError::Tool(ToolError::Cancelled {
            program: "ffmpeg".to_string(),
        }))
    }
}

/// Accepts the upload but cancels the run as it finishes, as a client
/// disconnecting right after the object lands would.
pub struct DisconnectingStore {
    inner: MemoryStore,
    cancel: CancellationToken,
}

impl DisconnectingStore {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            inner: MemoryStore::default(),
            cancel,
        }
    }

    pub fn put_attempts(&self) -> usize {
        self.inner.put_attempts()
    }
}

#[async_trait]
impl ObjectStore for DisconnectingStore {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        self.inner
            .put_file(bucket, key, path, content_type, cancel)
            .await?;
        self.cancel.cancel();
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        self.inner.presign_get(bucket, key, expires_in).await
    }

    async fn check_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.inner.check_bucket(bucket).await
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store; presigned URLs echo bucket, key and expiry.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    puts: AtomicUsize,
    fail_puts: bool,
    unreachable: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn put_attempts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        if self.fail_puts {
            return Err(StorageError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| StorageError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        PresignedUrl::new(
            format!(
                "https://store.test/{}/{}?X-Amz-Expires={}",
                bucket,
                key,
                expires_in.as_secs()
            ),
            SystemTime::now(),
            expires_in,
        )
    }

    async fn check_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self.unreachable {
            return Err(StorageError::Unreachable {
                bucket: bucket.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory video records.
#[derive(Default)]
pub struct MemoryRepository {
    videos: Mutex<HashMap<Uuid, Video>>,
    fail_updates: bool,
}

impl MemoryRepository {
    pub fn failing_updates() -> Self {
        Self {
            fail_updates: true,
            ..Self::default()
        }
    }

    pub fn insert_draft(&self, owner: Uuid) -> Video {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "Draft".to_string(),
            description: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        };
        self.videos.lock().unwrap().insert(video.id, video.clone());
        video
    }

    pub fn stored(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl VideoRepository for MemoryRepository {
    async fn create_video(
        &self,
        user_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> Result<Video, RepositoryError> {
        let mut video = self.insert_draft(user_id);
        video.title = title;
        video.description = description;
        self.videos.lock().unwrap().insert(video.id, video.clone());
        Ok(video)
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        Ok(self.stored(id))
    }

    async fn list_videos_for_user(&self, user_id: Uuid) -> Result<Vec<Video>, RepositoryError> {
        Ok(self
            .videos
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_video(&self, video: &Video) -> Result<Video, RepositoryError> {
        if self.fail_updates {
            return Err(RepositoryError::Corrupt {
                id: video.id.to_string(),
                message: "disk full".to_string(),
            });
        }

        let mut videos = self.videos.lock().unwrap();
        let stored = videos
            .get_mut(&video.id)
            .ok_or(RepositoryError::NotFound(video.id))?;
        stored.video_url = video.video_url.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

/// Config whose temp files land in `temp` so tests can assert cleanup.
pub fn test_config(temp: &TempDir, bucket: &str) -> AppConfig {
    AppConfig {
        s3_bucket: bucket.to_string(),
        upload_temp_dir: Some(temp.path().to_path_buf()),
        jwt_secret: "test_secret".to_string(),
        ..AppConfig::default()
    }
}

pub fn pipeline(
    config: AppConfig,
    probe: impl MediaProbe + 'static,
    transcoder: impl FastStartTranscoder + 'static,
    store: Arc<MemoryStore>,
    repo: Arc<MemoryRepository>,
) -> VideoPipeline {
    VideoPipeline::new(config, Arc::new(probe), Arc::new(transcoder), store, repo)
}

pub fn dir_is_empty(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path()).unwrap().next().is_none()
}
