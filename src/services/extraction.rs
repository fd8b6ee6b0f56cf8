use crate::models::ExtractedEntry;
use crate::services::error::PipelineError;
use crate::services::stager::StagedArchive;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Unpack a staged archive into its workspace and list the extracted files.
///
/// Only leaf files are returned, sorted by relative name. Zip parsing runs on the
/// blocking pool.
pub async fn extract(staged: &StagedArchive) -> Result<Vec<ExtractedEntry>, PipelineError> {
    let archive_path = staged.archive_path().to_path_buf();
    let target_dir = staged.workspace().extraction_dir();

    tokio::task::spawn_blocking(move || extract_to(&archive_path, &target_dir))
        .await
        .map_err(|e| PipelineError::ExtractionIo(format!("Extraction task failed: {}", e)))?
}

/// Synchronous core of [`extract`].
pub fn extract_to(archive_path: &Path, target_dir: &Path) -> Result<Vec<ExtractedEntry>, PipelineError> {
    let file = File::open(archive_path).map_err(|e| {
        PipelineError::ExtractionIo(format!("Failed to open {}: {}", archive_path.display(), e))
    })?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| PipelineError::CorruptArchive(format!("Failed to parse ZIP: {}", e)))?;

    fs::create_dir_all(target_dir).map_err(io_error(target_dir))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| PipelineError::CorruptArchive(format!("Failed to read ZIP entry {}: {}", i, e)))?;

        // Rejects absolute paths and `..` components.
        let relative = entry.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            PipelineError::CorruptArchive(format!(
                "Entry '{}' escapes the extraction directory",
                entry.name()
            ))
        })?;
        let out_path = target_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(io_error(&out_path))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let mut out = File::create(&out_path).map_err(io_error(&out_path))?;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let n = entry.read(&mut buffer).map_err(|e| {
                PipelineError::CorruptArchive(format!("Failed to decompress '{}': {}", entry.name(), e))
            })?;
            if n == 0 {
                break;
            }
            out.write_all(&buffer[..n]).map_err(io_error(&out_path))?;
        }
    }

    let mut entries = Vec::new();
    collect_files(target_dir, target_dir, &mut entries)?;
    entries.sort_by(|a, b| a.relative_name.cmp(&b.relative_name));

    tracing::info!("Extracted {} file(s) into {}", entries.len(), target_dir.display());
    Ok(entries)
}

/// Walk `dir` recursively, recording leaf files relative to `root`.
fn collect_files(root: &Path, dir: &Path, entries: &mut Vec<ExtractedEntry>) -> Result<(), PipelineError> {
    for item in fs::read_dir(dir).map_err(io_error(dir))? {
        let item = item.map_err(io_error(dir))?;
        let path = item.path();
        let file_type = item.file_type().map_err(io_error(&path))?;

        if file_type.is_dir() {
            collect_files(root, &path, entries)?;
        } else if file_type.is_file() {
            let size_bytes = item.metadata().map_err(io_error(&path))?.len();
            entries.push(ExtractedEntry {
                relative_name: relative_name(root, &path),
                local_path: path,
                size_bytes,
            });
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> PipelineError + '_ {
    move |e| PipelineError::ExtractionIo(format!("{}: {}", path.display(), e))
}
