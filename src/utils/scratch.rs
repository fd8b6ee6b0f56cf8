use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory owned by a single invocation.
///
/// The directory name carries the invocation id, so two invocations never share a
/// path even when they process the same archive. Everything below it is removed when
/// the workspace is dropped, on every exit path.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
    invocation_id: String,
}

impl ScratchWorkspace {
    pub fn create(root: &Path, invocation_id: &str) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("unzip-{}-", invocation_id))
            .tempdir_in(root)?;

        Ok(Self {
            dir,
            invocation_id: invocation_id.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Local path for the downloaded archive, derived from its identifier.
    pub fn archive_path(&self, archive_id: &str) -> PathBuf {
        self.path().join(format!("{}.zip", sanitize_file_name(archive_id)))
    }

    /// Directory the archive is unpacked into.
    pub fn extraction_dir(&self) -> PathBuf {
        self.path().join("extracted")
    }

    /// Remove the workspace now, reporting failures instead of swallowing them.
    pub fn close(self) {
        let path = self.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!("Failed to remove scratch directory {}: {}", path.display(), e);
        }
    }
}

/// Replace everything but `[A-Za-z0-9._-]` so an identifier is safe as a file name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "archive".to_string(),
        trimmed => trimmed.to_string(),
    }
}
