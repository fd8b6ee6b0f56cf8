pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::handlers;
use crate::config::FunctionConfig;
use crate::services::pipeline::ReuploadPipeline;
use crate::services::storage::BlobStore;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::execute::execute,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::ExecutionPayload,
            models::ExecutionResponse,
            models::FailedEntry,
            handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "execution", description = "Archive re-upload invocation"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReuploadPipeline>,
    pub storage: Arc<dyn BlobStore>,
    pub config: FunctionConfig,
    /// Root token; each invocation runs under a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(storage: Arc<dyn BlobStore>, config: FunctionConfig) -> Self {
        Self {
            pipeline: Arc::new(ReuploadPipeline::new(storage.clone(), config.clone())),
            storage,
            config,
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", post(handlers::execute::execute))
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
}
