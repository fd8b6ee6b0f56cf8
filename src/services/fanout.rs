use crate::models::{ExtractedEntry, UploadOutcome};
use crate::services::storage::{BlobStore, NewBlob};
use crate::utils::content_type::mime_for;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const CANCELLED_REASON: &str = "cancelled before upload started";

/// Uploads every extracted entry as a new blob, one outcome per entry.
///
/// Uploads are polled concurrently on the invocation's task, at most `concurrency` in
/// flight. Outcomes come back in entry order regardless of completion order. A failing or
/// panicking upload only affects its own outcome.
pub struct UploadFanout {
    store: Arc<dyn BlobStore>,
    bucket: String,
    concurrency: usize,
}

impl UploadFanout {
    pub fn new(store: Arc<dyn BlobStore>, bucket: impl Into<String>, concurrency: usize) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Once `cancel` fires no new uploads start; in-flight ones run to completion and
    /// the rest are reported as failures.
    pub async fn upload_all(
        &self,
        entries: &[ExtractedEntry],
        cancel: &CancellationToken,
    ) -> Vec<UploadOutcome> {
        let outcomes: Vec<UploadOutcome> = stream::iter(entries.iter().cloned())
            .map(|entry| self.upload_isolated(entry, cancel.clone()))
            .buffered(self.concurrency)
            .collect()
            .await;

        debug_assert_eq!(outcomes.len(), entries.len());
        outcomes
    }

    async fn upload_isolated(&self, entry: ExtractedEntry, cancel: CancellationToken) -> UploadOutcome {
        if cancel.is_cancelled() {
            tracing::warn!("Skipping {}: invocation cancelled", entry.relative_name);
            return UploadOutcome::Failure {
                entry_name: entry.relative_name,
                reason: CANCELLED_REASON.to_string(),
            };
        }

        let entry_name = entry.relative_name.clone();
        let upload = upload_entry(self.store.as_ref(), &self.bucket, entry);

        // Polled in place rather than spawned: dropping the invocation drops its uploads.
        match AssertUnwindSafe(upload).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Upload of {} panicked: {}", entry_name, message);
                UploadOutcome::Failure {
                    entry_name,
                    reason: format!("upload panicked: {}", message),
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

async fn upload_entry(store: &dyn BlobStore, bucket: &str, entry: ExtractedEntry) -> UploadOutcome {
    tracing::info!("Uploading: {} ({} bytes)", entry.relative_name, entry.size_bytes);

    let data = match tokio::fs::read(&entry.local_path).await {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", entry.local_path.display(), e);
            return UploadOutcome::Failure {
                entry_name: entry.relative_name,
                reason: format!("failed to read extracted file: {}", e),
            };
        }
    };

    let blob = NewBlob {
        name: entry.relative_name.clone(),
        content_type: mime_for(&entry.relative_name).to_string(),
        data,
    };

    match store.upload(bucket, blob).await {
        Ok(remote_id) => {
            tracing::info!("Uploaded OK: {} -> {}", entry.relative_name, remote_id);
            UploadOutcome::Success { remote_id }
        }
        Err(e) => {
            tracing::error!("Upload failed for {}: {}", entry.relative_name, e);
            UploadOutcome::Failure {
                entry_name: entry.relative_name,
                reason: e.to_string(),
            }
        }
    }
}
