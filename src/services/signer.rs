use crate::models::{Video, VideoResponse};
use crate::services::reference::{ReferenceError, StoredReference};
use crate::services::storage::{ObjectStore, PresignedUrl, StorageError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Lifetime of every URL handed to clients.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Store(#[from] StorageError),
}

/// Turns stored references into time-limited playback URLs.
///
/// Nothing is cached; every call signs afresh.
#[derive(Clone)]
pub struct UrlSigner {
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            ttl: SIGNED_URL_TTL,
        }
    }

    pub async fn sign(&self, bucket: &str, key: &str) -> Result<PresignedUrl, SignError> {
        Ok(self.store.presign_get(bucket, key, self.ttl).await?)
    }

    pub async fn sign_reference(&self, reference: &str) -> Result<PresignedUrl, SignError> {
        let reference = StoredReference::decode(reference)?;
        self.sign(reference.bucket(), reference.key()).await
    }

    /// Drafts with no stored reference come back with `video_url: None`.
    pub async fn sign_video(&self, video: Video) -> Result<VideoResponse, SignError> {
        let signed = match video.video_url.as_deref() {
            Some(reference) => Some(self.sign_reference(reference).await?),
            None => None,
        };

        Ok(VideoResponse {
            id: video.id,
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            video_url_expires_at: signed.as_ref().map(|s| s.expires_at),
            video_url: signed.map(|s| s.url),
            created_at: video.created_at,
            updated_at: video.updated_at,
        })
    }
}
