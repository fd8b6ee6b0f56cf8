use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Invocation payload after the boundary has unwrapped its transport encoding.
///
/// Both fields are optional here; the resolver decides whether the request is valid.
/// `fileId`/`projectSlug` are the field names older callers still send.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayload {
    #[serde(default, alias = "fileId")]
    pub archive_id: Option<String>,
    #[serde(default, alias = "projectSlug")]
    pub context: Option<String>,
}

/// A validated request: both fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub archive_id: String,
    pub context: String,
}

/// A leaf file produced by extraction, living inside the invocation's scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    /// Path relative to the extraction root, `/`-separated
    pub relative_name: String,
    pub local_path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success { remote_id: String },
    Failure { entry_name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailedEntry {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedEntry>,
}

impl PipelineResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Response envelope returned by every invocation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecutionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResponse {
    pub fn completed(result: PipelineResult) -> Self {
        Self {
            success: true,
            files: Some(result.succeeded),
            failed: result.failed,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            files: None,
            failed: Vec::new(),
            error: Some(message.into()),
        }
    }
}
