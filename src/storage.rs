use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::avatar_prefix;

/// Presigned avatar uploads expire after 10 minutes.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("presigning failed: {0}")]
    Presign(String),
    #[error("object store request failed: {0}")]
    Backend(String),
}

/// StorageService
///
/// Object storage for profile avatars. The S3 client talks to MinIO locally and
/// to any S3-compatible endpoint in production; tests use the mock.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if needed. Only called at local startup.
    async fn ensure_bucket_exists(&self);

    /// A signed URL letting the browser PUT exactly one object under `key`,
    /// constrained to `content_type`.
    async fn presign_put(&self, key: &str, content_type: &str) -> Result<String, StorageError>;

    /// Removes an object. Deleting a key that does not exist succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// avatar_object_key
///
/// `avatars/<user>/<random>.<ext>`. The extension comes from the uploaded file
/// name and falls back to `bin` when it is missing or not alphanumeric.
pub fn avatar_object_key(user_id: Uuid, filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    format!("{}{}.{}", avatar_prefix(user_id), Uuid::new_v4(), extension)
}

/// Drops `..`, `.` and empty segments so a key can never climb out of its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// S3StorageClient
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket: String,
}

impl S3StorageClient {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "cfa-prep-config");

        // Path-style addressing: MinIO and most S3-compatible gateways need it.
        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => tracing::info!(bucket = %self.bucket, "avatar bucket created"),
            // Already owned by us on every start after the first.
            Err(e) => tracing::debug!(bucket = %self.bucket, error = %e, "create_bucket skipped"),
        }
    }

    async fn presign_put(&self, key: &str, content_type: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

/// MockStorageService
///
/// Network-free `StorageService`. Records deleted keys so tests can assert on
/// avatar cleanup.
#[derive(Default)]
pub struct MockStorageService {
    /// When true, every call fails.
    pub should_fail: bool,
    pub deleted: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presign_put(&self, key: &str, _content_type: &str) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Presign("mock storage failure".to_string()));
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Backend("mock storage failure".to_string()));
        }
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(key.to_string());
        }
        Ok(())
    }
}

/// StorageState
///
/// The shared handle to the storage service stored in the application state.
pub type StorageState = Arc<dyn StorageService>;
