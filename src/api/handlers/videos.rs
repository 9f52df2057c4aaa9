use crate::AppState;
use crate::api::error::AppError;
use crate::models::{CreateVideoRequest, VideoResponse};
use crate::services::video_pipeline::{RawUpload, UploadRequest};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

/// Multipart body accepted by the upload endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct VideoUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub video: Vec<u8>,
}

fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid ID".to_string()))
}

fn acting_user(claims: &Claims) -> Result<Uuid, AppError> {
    claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("JWT subject is not a user id".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/video_upload/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = VideoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video processed and stored", body = VideoResponse),
        (status = 400, description = "Invalid ID or content type"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Video belongs to another user"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Upload too large")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = acting_user(&claims)?;

    // Client disconnect drops this future, which cancels the run
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let err_msg = e.to_string();
        if err_msg.contains("length limit exceeded") {
            AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
        } else {
            AppError::BadRequest(err_msg)
        }
    })? {
        if field.name() != Some("video") {
            continue;
        }

        let content_type = field.content_type().map(|s| s.to_string());
        let body = StreamReader::new(Box::pin(field.map_err(std::io::Error::other)));

        let video = state
            .pipeline
            .process_upload(
                UploadRequest {
                    video_id,
                    user_id,
                    upload: RawUpload { content_type, body },
                },
                &cancel,
            )
            .await?;

        return Ok(Json(state.signer.sign_video(video).await?));
    }

    Err(AppError::BadRequest(
        "couldn't retrieve video data: no 'video' field".to_string(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Draft video created", body = VideoResponse),
        (status = 400, description = "Missing title"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn create_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoResponse>), AppError> {
    let user_id = acting_user(&claims)?;

    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }

    let video = state
        .repo
        .create_video(user_id, title, req.description)
        .await?;

    tracing::info!(video_id = %video.id, user_id = %user_id, "Draft video created");

    Ok((StatusCode::CREATED, Json(state.signer.sign_video(video).await?)))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video with a freshly signed URL", body = VideoResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Video belongs to another user"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = acting_user(&claims)?;

    let video = state
        .repo
        .get_video(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video {} not found", video_id)))?;

    if video.user_id != user_id {
        return Err(AppError::Forbidden(
            "not authorized to view video".to_string(),
        ));
    }

    Ok(Json(state.signer.sign_video(video).await?))
}

#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "The caller's videos", body = Vec<VideoResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "videos"
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let user_id = acting_user(&claims)?;
    let videos = state.repo.list_videos_for_user(user_id).await?;

    let mut signed = Vec::with_capacity(videos.len());
    for video in videos {
        signed.push(state.signer.sign_video(video).await?);
    }

    Ok(Json(signed))
}
