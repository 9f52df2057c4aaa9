use crate::services::signer::SignError;
use crate::services::video_pipeline::PipelineError;
use crate::services::video_repository::RepositoryError;
use crate::utils::validation::ValidationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Signing error: {0}")]
    Sign(#[from] SignError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Pipeline(e) => e.kind(),
            AppError::Sign(SignError::Reference(_)) => "reference_format_error",
            AppError::Sign(SignError::Store(_)) => "store_error",
            AppError::Repository(RepositoryError::NotFound(_)) => "not_found",
            AppError::Repository(_) => "persistence_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "authorization_error",
            AppError::BadRequest(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Pipeline(e) => match e {
                PipelineError::Validation(ValidationError::TooLarge { .. }) => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
                PipelineError::VideoNotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::NotOwner { .. } => StatusCode::FORBIDDEN,
                PipelineError::Cancelled(_) => client_closed_request(),
                PipelineError::Lookup(_)
                | PipelineError::Staging(_)
                | PipelineError::Probe(_)
                | PipelineError::Transcode(_)
                | PipelineError::Store(_)
                | PipelineError::Reference(_)
                | PipelineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Sign(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Pipeline(PipelineError::Cancelled(_)))
    }
}

/// 499 Client Closed Request
fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let message = if status.is_server_error() {
            match &self {
                AppError::Pipeline(e) => {
                    tracing::error!(kind, stage = %e.stage(), "Video pipeline failed: {:?}", e)
                }
                other => tracing::error!(kind, "Internal error: {:?}", other),
            }
            "Internal Server Error".to_string()
        } else {
            if status == StatusCode::FORBIDDEN {
                tracing::warn!(kind, "{}", self);
            } else if self.is_cancelled() {
                tracing::info!(kind, "{}", self);
            }
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}
