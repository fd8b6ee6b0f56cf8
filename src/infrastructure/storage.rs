use crate::config::FunctionConfig;
use crate::services::appwrite::AppwriteBlobStore;
use crate::services::storage::{BlobStore, S3BlobStore};
use anyhow::{Result, anyhow};
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

/// Build the blob store client selected by `STORAGE_BACKEND`.
pub async fn setup_storage(config: &FunctionConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.storage_backend.as_str() {
        "s3" => Arc::new(setup_s3(config).await),
        "appwrite" => Arc::new(setup_appwrite(config)?),
        other => {
            tracing::warn!("Unknown storage backend '{}', using appwrite", other);
            Arc::new(setup_appwrite(config)?)
        }
    };

    if store.health_check().await {
        info!("✅ Blob store is reachable");
    } else {
        tracing::warn!("⚠️  Blob store unreachable! Invocations will fail until it recovers.");
    }

    Ok(store)
}

fn setup_appwrite(config: &FunctionConfig) -> Result<AppwriteBlobStore> {
    let endpoint = config
        .appwrite_endpoint
        .as_deref()
        .ok_or_else(|| anyhow!("Missing APPWRITE_ENDPOINT env var"))?;
    let project_id = config
        .appwrite_project_id
        .clone()
        .ok_or_else(|| anyhow!("Missing APPWRITE_PROJECT_ID env var"))?;
    let api_key = config
        .appwrite_api_key
        .clone()
        .ok_or_else(|| anyhow!("Missing APPWRITE_API_KEY env var"))?;

    info!("☁️  Appwrite Storage: {} (Project: {})", endpoint, project_id);

    Ok(AppwriteBlobStore::new(endpoint, project_id, api_key)?)
}

async fn setup_s3(config: &FunctionConfig) -> S3BlobStore {
    let mut loader = aws_config::from_env().region(Region::new(config.s3_region.clone()));

    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.s3_access_key, &config.s3_secret_key) {
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    info!(
        "☁️  S3 Storage: {} (Region: {})",
        config.s3_endpoint.as_deref().unwrap_or("aws default"),
        config.s3_region
    );

    let aws_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.s3_endpoint.is_some())
        .build();

    S3BlobStore::new(aws_sdk_s3::Client::from_conf(s3_config))
}
