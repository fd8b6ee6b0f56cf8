//! Batch re-upload pipeline: stage → extract → fan out → aggregate.
//!
//! Stages run strictly in sequence. Only the fan-out runs work concurrently, and it
//! never fails as a whole: per-entry problems end up in [`PipelineResult::failed`].
//! Any failure before the fan-out aborts the invocation with a [`PipelineError`].

use crate::config::FunctionConfig;
use crate::models::{PipelineResult, UploadRequest};
use crate::services::aggregate::aggregate;
use crate::services::error::PipelineError;
use crate::services::extraction::extract;
use crate::services::fanout::UploadFanout;
use crate::services::stager::ArchiveStager;
use crate::services::storage::BlobStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct ReuploadPipeline {
    store: Arc<dyn BlobStore>,
    config: FunctionConfig,
}

impl ReuploadPipeline {
    pub fn new(store: Arc<dyn BlobStore>, config: FunctionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FunctionConfig {
        &self.config
    }

    /// Run one invocation under a freshly generated invocation id.
    pub async fn run(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let invocation_id = Uuid::new_v4().to_string();
        self.run_as(&invocation_id, request, cancel).await
    }

    #[tracing::instrument(
        name = "reupload",
        skip_all,
        fields(invocation = %invocation_id, archive_id = %request.archive_id, context = %request.context)
    )]
    pub async fn run_as(
        &self,
        invocation_id: &str,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let bucket = self.config.require_bucket()?;

        let stager = ArchiveStager::new(
            self.store.as_ref(),
            &self.config.scratch_root,
            self.config.max_archive_size,
        );
        let staged = stager.stage(bucket, &request.archive_id, invocation_id).await?;

        // Dropping `staged` on the error path removes the workspace as well.
        let entries = extract(&staged).await?;
        tracing::info!(
            "Files extracted (count): {} in workspace {}",
            entries.len(),
            staged.workspace().invocation_id()
        );

        let fanout = UploadFanout::new(self.store.clone(), bucket, self.config.upload_concurrency);
        let outcomes = fanout.upload_all(&entries, cancel).await;
        staged.cleanup();

        let result = aggregate(outcomes);
        if result.failed.is_empty() {
            tracing::info!("Uploaded {} file(s)", result.succeeded.len());
        } else {
            tracing::warn!(
                "Uploaded {} of {} file(s); {} failed",
                result.succeeded.len(),
                result.total(),
                result.failed.len()
            );
        }

        Ok(result)
    }
}
