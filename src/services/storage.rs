use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("upload of {bucket}/{key} failed: {message}")]
    UploadFailed {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("presigning {bucket}/{key} failed: {message}")]
    PresignFailed {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("bucket {bucket} is unreachable: {message}")]
    Unreachable { bucket: String, message: String },

    #[error("invalid presign expiry: {0}")]
    InvalidExpiry(String),

    #[error("upload cancelled")]
    Cancelled,
}

impl StorageError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }
}

/// Time-limited GET URL for one object.
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    pub url: String,
    pub signed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PresignedUrl {
    pub fn new(url: String, signed_at: SystemTime, expires_in: Duration) -> Result<Self, StorageError> {
        let signed_at = DateTime::<Utc>::from(signed_at);
        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|e| StorageError::InvalidExpiry(e.to_string()))?;
        Ok(Self {
            url,
            signed_at,
            expires_at: signed_at + ttl,
        })
    }
}

/// Remote object storage used by the upload pipeline and the URL signer.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Streams the file at `path` to `bucket/key`, tagged with `content_type`.
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError>;

    /// Mints a GET URL valid from now until `expires_in` has elapsed.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError>;

    /// Confirms `bucket` exists and the credentials can reach it.
    async fn check_bucket(&self, bucket: &str) -> Result<(), StorageError>;
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Presigns with an explicit start time.
    pub async fn presign_get_at(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        signed_at: SystemTime,
    ) -> Result<PresignedUrl, StorageError> {
        let presigning = PresigningConfig::builder()
            .start_time(signed_at)
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::InvalidExpiry(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::PresignFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        PresignedUrl::new(request.uri().to_string(), signed_at, expires_in)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let start = std::time::Instant::now();

        let size = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|e| StorageError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StorageError::Cancelled),
            result = request => result,
        };

        result.map_err(|e| {
            tracing::error!(
                error = %DisplayErrorContext(&e),
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            }
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        self.presign_get_at(bucket, key, expires_in, SystemTime::now())
            .await
    }

    async fn check_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Unreachable {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })
    }
}
