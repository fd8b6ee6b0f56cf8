use crate::services::error::PipelineError;
use crate::services::storage::BlobStore;
use crate::utils::scratch::ScratchWorkspace;
use std::path::{Path, PathBuf};

/// Raw archive bytes persisted in the invocation's scratch workspace.
///
/// Owns the workspace: dropping the staged archive removes the archive file and
/// anything extracted next to it.
#[derive(Debug)]
pub struct StagedArchive {
    workspace: ScratchWorkspace,
    archive_path: PathBuf,
    size_bytes: u64,
}

impl StagedArchive {
    pub fn workspace(&self) -> &ScratchWorkspace {
        &self.workspace
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Remove the scratch workspace now.
    pub fn cleanup(self) {
        self.workspace.close();
    }
}

/// Downloads archives and writes them into a fresh per-invocation workspace.
pub struct ArchiveStager<'a> {
    store: &'a dyn BlobStore,
    scratch_root: &'a Path,
    max_archive_size: u64,
}

impl<'a> ArchiveStager<'a> {
    pub fn new(store: &'a dyn BlobStore, scratch_root: &'a Path, max_archive_size: u64) -> Self {
        Self {
            store,
            scratch_root,
            max_archive_size,
        }
    }

    /// Fetch `archive_id` from `bucket` and persist it under a path namespaced by
    /// `invocation_id`.
    ///
    /// The download completes before anything touches the scratch disk, so a failed
    /// download leaves no files behind. No retries.
    pub async fn stage(
        &self,
        bucket: &str,
        archive_id: &str,
        invocation_id: &str,
    ) -> Result<StagedArchive, PipelineError> {
        tracing::info!("Downloading archive {} from bucket {}", archive_id, bucket);
        let data = self
            .store
            .download(bucket, archive_id, self.max_archive_size)
            .await?;

        // Not every store can enforce the limit while downloading.
        let size_bytes = data.len() as u64;
        if size_bytes > self.max_archive_size {
            return Err(PipelineError::ArchiveTooLarge {
                size: size_bytes,
                max: self.max_archive_size,
            });
        }

        let workspace = ScratchWorkspace::create(self.scratch_root, invocation_id).map_err(|e| {
            PipelineError::Transfer(format!("Failed to create scratch directory: {}", e))
        })?;
        let archive_path = workspace.archive_path(archive_id);

        // The workspace is dropped (and removed) if this write fails.
        tokio::fs::write(&archive_path, &data).await.map_err(|e| {
            PipelineError::Transfer(format!(
                "Failed to write archive to {}: {}",
                archive_path.display(),
                e
            ))
        })?;

        tracing::info!(
            "Staged archive {} ({} bytes) at {}",
            archive_id,
            size_bytes,
            archive_path.display()
        );

        Ok(StagedArchive {
            workspace,
            archive_path,
            size_bytes,
        })
    }
}
