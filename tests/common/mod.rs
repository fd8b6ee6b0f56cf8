#![allow(dead_code)]

use async_trait::async_trait;
use bucket_unzip::config::FunctionConfig;
use bucket_unzip::services::storage::{BlobStore, NewBlob, StorageError};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zip::write::FileOptions;

pub const BUCKET: &str = "uploads";

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// In-memory blob store that records every call.
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
    fail_names: HashSet<String>,
    panic_names: HashSet<String>,
    upload_delay: Option<Duration>,
    next_id: AtomicUsize,
    pub downloads: AtomicUsize,
    pub uploads: AtomicUsize,
    pub completed: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            fail_names: HashSet::new(),
            panic_names: HashSet::new(),
            upload_delay: None,
            next_id: AtomicUsize::new(1),
            downloads: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Every upload sleeps this long before storing the blob.
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Uploads of entries with this name are rejected.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_names.insert(name.to_string());
        self
    }

    /// Uploads of entries with this name panic inside the store.
    pub fn panicking_on(mut self, name: &str) -> Self {
        self.panic_names.insert(name.to_string());
        self
    }

    pub fn insert(&self, id: &str, data: Vec<u8>) {
        self.blobs.lock().unwrap().insert(
            id.to_string(),
            StoredBlob {
                name: id.to_string(),
                content_type: "application/zip".to_string(),
                data,
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<StoredBlob> {
        self.blobs.lock().unwrap().get(id).cloned()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Uploads that were started, including failed and unfinished ones.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Uploads that stored a blob.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, _bucket: &str, blob_id: &str, max_bytes: u64) -> Result<Bytes, StorageError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let data = self
            .get(blob_id)
            .map(|blob| blob.data)
            .ok_or_else(|| StorageError::NotFound(blob_id.to_string()))?;

        let size = data.len() as u64;
        if size > max_bytes {
            return Err(StorageError::TooLarge { size, max: max_bytes });
        }
        Ok(Bytes::from(data))
    }

    async fn upload(&self, _bucket: &str, blob: NewBlob) -> Result<String, StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);

        if self.panic_names.contains(&blob.name) {
            panic!("store exploded while uploading {}", blob.name);
        }
        if self.fail_names.contains(&blob.name) {
            return Err(StorageError::Transfer(format!("rejected {}", blob.name)));
        }
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }

        let id = format!("blob-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.blobs.lock().unwrap().insert(
            id.clone(),
            StoredBlob {
                name: blob.name,
                content_type: blob.content_type,
                data: blob.data,
            },
        );
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Build a zip archive in memory. Names ending in `/` become directory entries.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, data) in entries {
            if let Some(dir) = name.strip_suffix('/') {
                writer.add_directory(dir, FileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

pub fn test_config(scratch_root: &Path) -> FunctionConfig {
    FunctionConfig {
        scratch_root: scratch_root.to_path_buf(),
        ..FunctionConfig::development()
    }
}

/// Number of entries left under the scratch root.
pub fn scratch_entries(scratch_root: &Path) -> usize {
    std::fs::read_dir(scratch_root)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
