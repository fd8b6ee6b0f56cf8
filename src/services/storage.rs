use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Blob is {size} bytes, limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

/// A new blob to be created in a bucket. The store picks the identifier.
#[derive(Debug, Clone)]
pub struct NewBlob {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Key-addressed blob storage, accessed through single-blob download/upload calls.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full contents of `blob_id` from `bucket`.
    ///
    /// Fails with [`StorageError::TooLarge`] as soon as the blob is known to exceed
    /// `max_bytes`, without buffering the rest of it.
    async fn download(&self, bucket: &str, blob_id: &str, max_bytes: u64) -> Result<Bytes, StorageError>;

    /// Create a new blob and return the identifier the store assigned to it.
    ///
    /// Implementations must never overwrite an existing blob.
    async fn upload(&self, bucket: &str, blob: NewBlob) -> Result<String, StorageError>;

    /// Check if the store is reachable
    async fn health_check(&self) -> bool;
}

pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn download(&self, bucket: &str, blob_id: &str, max_bytes: u64) -> Result<Bytes, StorageError> {
        let res = self
            .client
            .get_object()
            .bucket(bucket)
            .key(blob_id)
            .send()
            .await;

        let output = match res {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(StorageError::NotFound(format!("{}/{}", bucket, blob_id)));
                }
                return Err(StorageError::Transfer(service_error.to_string()));
            }
        };

        if let Some(size) = output.content_length().and_then(|len| u64::try_from(len).ok())
            && size > max_bytes
        {
            return Err(StorageError::TooLarge { size, max: max_bytes });
        }

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transfer(e.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn upload(&self, bucket: &str, blob: NewBlob) -> Result<String, StorageError> {
        let key = Uuid::new_v4().to_string();
        let original_name = utf8_percent_encode(&blob.name, NON_ALPHANUMERIC).to_string();
        let size = blob.data.len() as i64;

        let res = self
            .client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .if_none_match("*")
            .content_type(&blob.content_type)
            .content_length(size)
            .metadata("original-name", original_name)
            .body(ByteStream::from(blob.data))
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, name={}, error={:?}",
                bucket,
                key,
                blob.name,
                e
            );
            return Err(StorageError::Transfer(e.into_service_error().to_string()));
        }

        Ok(key)
    }

    async fn health_check(&self) -> bool {
        self.client.list_buckets().send().await.is_ok()
    }
}
