//! Blob storage abstraction for photo uploads.
//!
//! The photo service only needs "store bytes, get an address back" and
//! "delete by key"; backends decide where the bytes actually live.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::StorageSettings;
use crate::{AppError, AppResult};

/// Stored blob metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Delete a file. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Shared handle to a storage backend.
pub type StorageService = Arc<dyn StorageBackend>;

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Create a local storage backend from configuration.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.base_path.clone(), settings.base_url.clone())
    }
}

fn describe(key: &str, data: &[u8], url: String) -> UploadedFile {
    UploadedFile {
        key: key.to_string(),
        url,
        size: data.len() as u64,
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        tracing::debug!(key = %key, size = data.len(), content_type = %content_type, "Stored file");
        Ok(describe(key, data, self.public_url(key)))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
            tracing::debug!(key = %key, "Deleted file");
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        tokio::fs::try_exists(self.base_path.join(key))
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat file: {e}")))
    }
}

/// In-process storage backend for tests and ephemeral deployments.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    base_url: String,
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage backend.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: Arc::default(),
        }
    }

    /// Number of blobs currently stored.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Whether no blobs are stored.
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        _content_type: &str,
    ) -> AppResult<UploadedFile> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), data.to_vec());
        Ok(describe(key, data, self.public_url(key)))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }
}

/// Generate a unique storage key for an uploaded photo.
#[must_use]
pub fn generate_storage_key(user_id: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();
    let timestamp = now.timestamp_millis();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && !ext.is_empty())
        .unwrap_or("bin");

    format!(
        "photos/{}/{}/{}_{}.{}",
        date_path,
        user_id,
        timestamp,
        uuid::Uuid::new_v4(),
        extension
    )
}
