//! # Local Durable Storage
//!
//! Small key/value store on the customer's device. Holds the cart between
//! sessions.
//!
//! ## Adapters
//! - [`MemoryStorage`] - process memory, for tests and throwaway sessions
//! - [`FileStorage`] - one JSON object file under the platform data dir

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// File name used by [`FileStorage::in_data_dir`].
pub const STORAGE_FILE_NAME: &str = "local-storage.json";

/// String key/value storage.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}

// =============================================================================
// Memory Storage
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.values().remove(key);
        Ok(())
    }
}

// =============================================================================
// File Storage
// =============================================================================

/// Key/value pairs kept as a JSON object in a single file.
///
/// The whole file is rewritten on every change. A file that cannot be
/// parsed is treated as empty (and replaced on the next write).
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage file in the platform data directory
    /// (e.g. `~/.local/share/storefront/` on Linux).
    pub fn in_data_dir() -> StoreResult<Self> {
        let dirs = ProjectDirs::from("cl", "frutiandante", "storefront").ok_or_else(|| {
            StoreError::Storage("could not determine data directory".to_string())
        })?;
        Ok(Self::new(dirs.data_dir().join(STORAGE_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "Local storage file unreadable, starting empty");
                Ok(Map::new())
            }
        }
    }

    fn write(&self, map: &Map<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), keys = map.len(), "Local storage saved");
        Ok(())
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.guard();
        Ok(self
            .read()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.guard();
        let mut map = self.read()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write(&map)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = self.guard();
        let mut map = self.read()?;
        if map.remove(key).is_some() {
            self.write(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("frutiandante-{}-{}", name, uuid::Uuid::new_v4().simple()))
            .join(STORAGE_FILE_NAME)
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("cart").unwrap(), None);
        storage.set("cart", "[]").unwrap();
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("[]"));
        storage.remove("cart").unwrap();
        assert_eq!(storage.get("cart").unwrap(), None);
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let path = temp_path("persist");
        FileStorage::new(&path).set("cart", "[1]").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("cart").unwrap().as_deref(), Some("[1]"));

        reopened.remove("cart").unwrap();
        assert_eq!(FileStorage::new(&path).get("cart").unwrap(), None);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_storage_corrupt_file_reads_empty() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("cart").unwrap(), None);
        storage.set("cart", "[]").unwrap();
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("[]"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
