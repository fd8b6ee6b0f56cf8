use crate::services::error::PipelineError;
use std::env;
use std::path::PathBuf;

/// Runtime configuration for the function, read once at startup
#[derive(Debug, Clone)]
pub struct FunctionConfig {
    /// Bucket holding both the archives and the re-uploaded entries
    pub bucket_id: Option<String>,

    /// Blob store backend: "appwrite" or "s3" (default: "appwrite")
    pub storage_backend: String,

    /// Appwrite API endpoint, e.g. https://cloud.appwrite.io/v1
    pub appwrite_endpoint: Option<String>,
    /// Appwrite project identifier
    pub appwrite_project_id: Option<String>,
    /// Appwrite API key
    pub appwrite_api_key: Option<String>,

    /// S3-compatible endpoint (default: AWS)
    pub s3_endpoint: Option<String>,
    /// S3 region (default: "us-east-1")
    pub s3_region: String,
    /// Static S3 credentials; the default AWS chain is used when unset
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// Root under which each invocation gets its own scratch directory
    pub scratch_root: PathBuf,

    /// Maximum number of entry uploads in flight (default: 4)
    pub upload_concurrency: usize,

    /// Largest archive accepted in bytes (default: 512 MB)
    pub max_archive_size: u64,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            bucket_id: None,
            storage_backend: "appwrite".to_string(),
            appwrite_endpoint: None,
            appwrite_project_id: None,
            appwrite_api_key: None,
            s3_endpoint: None,
            s3_region: "us-east-1".to_string(),
            s3_access_key: None,
            s3_secret_key: None,
            scratch_root: env::temp_dir(),
            upload_concurrency: 4,
            max_archive_size: 512 * 1024 * 1024, // 512 MB
        }
    }
}

impl FunctionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bucket_id: non_empty_var("UNIFIED_BUCKET_ID"),

            storage_backend: env::var("STORAGE_BACKEND")
                .map(|v| v.to_lowercase())
                .unwrap_or(default.storage_backend),

            appwrite_endpoint: non_empty_var("APPWRITE_ENDPOINT"),
            appwrite_project_id: non_empty_var("APPWRITE_PROJECT_ID"),
            appwrite_api_key: non_empty_var("APPWRITE_API_KEY"),

            s3_endpoint: non_empty_var("S3_ENDPOINT"),
            s3_region: env::var("S3_REGION").unwrap_or(default.s3_region),
            s3_access_key: non_empty_var("S3_ACCESS_KEY"),
            s3_secret_key: non_empty_var("S3_SECRET_KEY"),

            scratch_root: env::var("SCRATCH_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.scratch_root),

            upload_concurrency: env::var("UPLOAD_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|v| v.max(1))
                .unwrap_or(default.upload_concurrency),

            max_archive_size: env::var("MAX_ARCHIVE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_archive_size),
        }
    }

    /// Create config for development and tests (bucket set, scratch in the OS temp dir)
    pub fn development() -> Self {
        Self {
            bucket_id: Some("uploads".to_string()),
            storage_backend: "appwrite".to_string(),
            appwrite_endpoint: Some("http://localhost/v1".to_string()),
            appwrite_project_id: Some("local".to_string()),
            appwrite_api_key: Some("local-key".to_string()),
            ..Self::default()
        }
    }

    /// The target bucket, or a configuration error when it was never set.
    pub fn require_bucket(&self) -> Result<&str, PipelineError> {
        self.bucket_id
            .as_deref()
            .ok_or_else(|| PipelineError::Configuration("Missing UNIFIED_BUCKET_ID env var".to_string()))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
