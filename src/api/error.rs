use crate::models::ExecutionResponse;
use crate::services::error::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Every top-level failure is reported as a 500 with the uniform envelope.
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn to_response_body(&self) -> ExecutionResponse {
        ExecutionResponse::failed(self.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Pipeline(e) => tracing::error!("Invocation failed: {}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }

        (self.status(), Json(self.to_response_body())).into_response()
    }
}
