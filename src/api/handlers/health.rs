use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when both dependencies answer, "degraded" otherwise
    pub status: String,
    pub database: String,
    pub storage: String,
    pub version: String,
}

/// Pings the database and checks the upload bucket.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database and bucket reachable", body = HealthResponse),
        (status = 503, description = "A dependency is unreachable", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = state.db.ping().await.is_ok();

    let storage_ok = match state.store.check_bucket(&state.config.s3_bucket).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: storage unreachable");
            false
        }
    };

    let (status, label) = if database_ok && storage_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            database: if database_ok { "connected" } else { "disconnected" }.to_string(),
            storage: if storage_ok { "reachable" } else { "unreachable" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
