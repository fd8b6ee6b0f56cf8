use crate::services::storage::StorageError;
use thiserror::Error;

/// Failures that abort a whole invocation.
///
/// Per-entry upload failures are not represented here; they are recorded as
/// [`crate::models::UploadOutcome::Failure`] and never abort the batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Archive not found: {0}")]
    NotFound(String),

    #[error("Archive transfer failed: {0}")]
    Transfer(String),

    #[error("Archive too large: {size} bytes (max {max} bytes)")]
    ArchiveTooLarge { size: u64, max: u64 },

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Extraction I/O failure: {0}")]
    ExtractionIo(String),
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => PipelineError::NotFound(id),
            StorageError::Transfer(msg) => PipelineError::Transfer(msg),
            StorageError::TooLarge { size, max } => PipelineError::ArchiveTooLarge { size, max },
        }
    }
}
