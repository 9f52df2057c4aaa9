use crate::entities::{prelude::*, videos};
use crate::models::Video;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("video {0} not found")]
    NotFound(Uuid),

    #[error("corrupt video record {id}: {message}")]
    Corrupt { id: String, message: String },
}

/// Persistence for video records.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create_video(
        &self,
        user_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> Result<Video, RepositoryError>;

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError>;

    /// Newest first.
    async fn list_videos_for_user(&self, user_id: Uuid) -> Result<Vec<Video>, RepositoryError>;

    /// Writes `video_url` and bumps `updated_at`; every other column is left as stored.
    async fn update_video(&self, video: &Video) -> Result<Video, RepositoryError>;
}

impl TryFrom<videos::Model> for Video {
    type Error = RepositoryError;

    fn try_from(model: videos::Model) -> Result<Self, Self::Error> {
        let parse = |value: &str| {
            Uuid::parse_str(value).map_err(|e| RepositoryError::Corrupt {
                id: model.id.clone(),
                message: e.to_string(),
            })
        };

        Ok(Video {
            id: parse(&model.id)?,
            user_id: parse(&model.user_id)?,
            title: model.title,
            description: model.description,
            video_url: model.video_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub struct SeaOrmVideoRepository {
    db: DatabaseConnection,
}

impl SeaOrmVideoRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoRepository for SeaOrmVideoRepository {
    async fn create_video(
        &self,
        user_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> Result<Video, RepositoryError> {
        let now = Utc::now();
        let model = videos::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            title: Set(title),
            description: Set(description),
            video_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Video::try_from(model)
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        Videos::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(Video::try_from)
            .transpose()
    }

    async fn list_videos_for_user(&self, user_id: Uuid) -> Result<Vec<Video>, RepositoryError> {
        Videos::find()
            .filter(videos::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(videos::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Video::try_from)
            .collect()
    }

    async fn update_video(&self, video: &Video) -> Result<Video, RepositoryError> {
        let existing = Videos::find_by_id(video.id.to_string())
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(video.id))?;

        let mut active: videos::ActiveModel = existing.into();
        active.video_url = Set(video.video_url.clone());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        Video::try_from(updated)
    }
}
