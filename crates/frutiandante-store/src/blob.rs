//! # Blob Storage
//!
//! Port for product image uploads, plus an in-memory adapter.
//! Upload failures are returned to the caller and never published on the
//! error channel.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Largest accepted upload (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Uploads bytes and returns a retrieval URL.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<String>;
}

/// Stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Keeps uploads in memory and hands out `memory://` URLs.
#[derive(Debug, Default)]
pub struct MemoryBlobStorage {
    objects: Mutex<HashMap<String, Blob>>,
    failing: Mutex<bool>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upload fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self
            .failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = failing;
    }

    pub fn get(&self, path: &str) -> Option<Blob> {
        self.objects().get(path).cloned()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<String> {
        if *self
            .failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
        {
            return Err(StoreError::UploadFailed("storage offline".to_string()));
        }
        if bytes.is_empty() {
            return Err(StoreError::UploadFailed("empty file".to_string()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StoreError::UploadFailed(format!(
                "{} bytes exceeds the {} byte limit",
                bytes.len(),
                MAX_UPLOAD_BYTES
            )));
        }
        if !content_type.starts_with("image/") {
            return Err(StoreError::UploadFailed(format!(
                "unsupported content type {}",
                content_type
            )));
        }

        debug!(path, size = bytes.len(), content_type, "Blob stored");
        self.objects().insert(
            path.to_string(),
            Blob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("memory://{}", path))
    }
}
