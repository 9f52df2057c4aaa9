pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::signer::UrlSigner;
use crate::services::storage::ObjectStore;
use crate::services::video_pipeline::VideoPipeline;
use crate::services::video_repository::VideoRepository;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Slack allowed on top of `max_upload_size` for multipart framing.
const MULTIPART_OVERHEAD: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::videos::upload_video,
        api::handlers::videos::create_video,
        api::handlers::videos::get_video,
        api::handlers::videos::list_videos,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::videos::VideoUploadForm,
            api::handlers::health::HealthResponse,
            models::Video,
            models::VideoResponse,
            models::CreateVideoRequest,
            services::probe::AspectClass,
        )
    ),
    modifiers(&JwtSecurity),
    tags(
        (name = "videos", description = "Video upload and playback endpoints"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

struct JwtSecurity;

impl Modify for JwtSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub repo: Arc<dyn VideoRepository>,
    pub pipeline: Arc<VideoPipeline>,
    pub store: Arc<dyn ObjectStore>,
    pub signer: UrlSigner,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let authenticated = Router::new()
        .route(
            "/api/video_upload/:id",
            post(api::handlers::videos::upload_video).layer(
                axum::extract::DefaultBodyLimit::max(
                    state.config.max_upload_size.saturating_add(MULTIPART_OVERHEAD),
                ),
            ),
        )
        .route(
            "/api/videos",
            post(api::handlers::videos::create_video).get(api::handlers::videos::list_videos),
        )
        .route("/api/videos/:id", get(api::handlers::videos::get_video))
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .merge(authenticated)
        .layer(cors)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
