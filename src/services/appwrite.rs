//! Appwrite storage client.
//!
//! Talks to the Appwrite REST API directly with `reqwest`. Uploads let the server
//! generate the file identifier (`fileId=unique()`); anything larger than
//! [`CHUNK_SIZE`] is sent as a sequence of `Content-Range` chunks, which is how the
//! API accepts big files.

use crate::services::storage::{BlobStore, NewBlob, StorageError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Appwrite rejects single requests above 5 MiB.
pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Default timeout for storage requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const SERVER_GENERATED_ID: &str = "unique()";

#[derive(Deserialize)]
struct AppwriteFile {
    #[serde(rename = "$id")]
    id: String,
}

pub struct AppwriteBlobStore {
    client: Client,
    endpoint: String,
    project_id: String,
    api_key: String,
}

impl AppwriteBlobStore {
    pub fn new(endpoint: &str, project_id: String, api_key: String) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::Transfer(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            api_key,
        })
    }

    fn files_url(&self, bucket: &str) -> String {
        format!("{}/storage/buckets/{}/files", self.endpoint, bucket)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    async fn send_chunk(
        &self,
        bucket: &str,
        blob: &NewBlob,
        file_id: Option<&str>,
        range: Option<(usize, usize)>,
    ) -> Result<AppwriteFile, StorageError> {
        let (start, end) = range.unwrap_or((0, blob.data.len()));
        let part = Part::bytes(blob.data[start..end].to_vec())
            .file_name(blob.name.clone())
            .mime_str(&blob.content_type)
            .map_err(|e| StorageError::Transfer(format!("Invalid content type: {}", e)))?;

        let form = Form::new()
            .text("fileId", file_id.unwrap_or(SERVER_GENERATED_ID).to_string())
            .part("file", part);

        let mut request = self.authorized(self.client.post(self.files_url(bucket)));
        if range.is_some() {
            request = request.header(
                "Content-Range",
                format!("bytes {}-{}/{}", start, end - 1, blob.data.len()),
            );
        }
        if let Some(id) = file_id {
            request = request.header("x-appwrite-id", id);
        }

        let response = request
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Transfer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Transfer(format!(
                "Appwrite returned {}: {}",
                status, body
            )));
        }

        response
            .json::<AppwriteFile>()
            .await
            .map_err(|e| StorageError::Transfer(format!("Unexpected upload response: {}", e)))
    }
}

#[async_trait]
impl BlobStore for AppwriteBlobStore {
    async fn download(&self, bucket: &str, blob_id: &str, max_bytes: u64) -> Result<Bytes, StorageError> {
        let url = format!("{}/{}/download", self.files_url(bucket), blob_id);

        let mut response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| StorageError::Transfer(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(StorageError::NotFound(format!("{}/{}", bucket, blob_id)));
            }
            status if !status.is_success() => {
                return Err(StorageError::Transfer(format!(
                    "Appwrite returned {} for {}/{}",
                    status, bucket, blob_id
                )));
            }
            _ => {}
        }

        if let Some(size) = response.content_length()
            && size > max_bytes
        {
            return Err(StorageError::TooLarge { size, max: max_bytes });
        }

        // Content-Length may be absent on chunked responses.
        let mut data = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| StorageError::Transfer(e.to_string()))?
        {
            let size = (data.len() + chunk.len()) as u64;
            if size > max_bytes {
                return Err(StorageError::TooLarge { size, max: max_bytes });
            }
            data.extend_from_slice(&chunk);
        }

        Ok(data.freeze())
    }

    async fn upload(&self, bucket: &str, blob: NewBlob) -> Result<String, StorageError> {
        if blob.data.len() <= CHUNK_SIZE {
            let file = self.send_chunk(bucket, &blob, None, None).await?;
            return Ok(file.id);
        }

        let total = blob.data.len();
        let mut file_id: Option<String> = None;
        let mut start = 0;

        while start < total {
            let end = (start + CHUNK_SIZE).min(total);
            let file = self
                .send_chunk(bucket, &blob, file_id.as_deref(), Some((start, end)))
                .await?;
            tracing::debug!("Uploaded chunk {}-{} of {} for {}", start, end, total, blob.name);
            file_id.get_or_insert(file.id);
            start = end;
        }

        file_id.ok_or_else(|| StorageError::Transfer("No chunks were uploaded".to_string()))
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health/version", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
