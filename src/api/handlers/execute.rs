use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ExecutionPayload, ExecutionResponse};
use crate::services::error::PipelineError;
use crate::services::resolver::resolve;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use tracing::info;

/// Transport fields a platform may wrap the real payload in, in lookup order.
const STRING_OR_OBJECT: &str = "body";
const STRING_ONLY: &str = "bodyRaw";
const LEGACY_PAYLOAD: &str = "payload";

#[utoipa::path(
    post,
    path = "/",
    request_body = ExecutionPayload,
    responses(
        (status = 200, description = "Archive extracted and entries re-uploaded", body = ExecutionResponse),
        (status = 500, description = "Invocation failed before any entry was uploaded", body = ExecutionResponse)
    ),
    tag = "execution"
)]
pub async fn execute(State(state): State<AppState>, body: Bytes) -> Response {
    match invoke(&state, &body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Run one invocation from raw request bytes.
///
/// Shared by the HTTP handler and the command-line `--invoke` mode.
pub async fn invoke(state: &AppState, raw: &[u8]) -> Result<ExecutionResponse, AppError> {
    let payload = normalize_payload(raw)?;
    let request = resolve(&payload)?;

    info!(
        "📦 Payload OK: archiveId={}, context={}",
        request.archive_id, request.context
    );

    let result = state
        .pipeline
        .run(&request, &state.shutdown.child_token())
        .await?;

    Ok(ExecutionResponse::completed(result))
}

/// Unwrap the transport encoding around the invocation payload.
///
/// An empty body is treated as an empty object so the resolver reports the
/// missing fields.
pub fn normalize_payload(raw: &[u8]) -> Result<Value, PipelineError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let request: Value = serde_json::from_slice(raw).map_err(|e| {
        PipelineError::InvalidRequest(format!("Request body is not valid JSON: {}", e))
    })?;

    if let Value::Object(fields) = &request {
        for (key, allow_object) in [
            (STRING_OR_OBJECT, true),
            (STRING_ONLY, false),
            (LEGACY_PAYLOAD, true),
        ] {
            if let Some(payload) = embedded(fields, key, allow_object)? {
                return Ok(payload);
            }
        }
    }

    Ok(request)
}

fn embedded(
    fields: &Map<String, Value>,
    key: &str,
    allow_object: bool,
) -> Result<Option<Value>, PipelineError> {
    match fields.get(key) {
        Some(Value::String(text)) if !text.trim().is_empty() => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| {
                PipelineError::InvalidRequest(format!("Field '{}' is not valid JSON: {}", key, e))
            }),
        Some(Value::Object(inner)) if allow_object => Ok(Some(Value::Object(inner.clone()))),
        _ => Ok(None),
    }
}
