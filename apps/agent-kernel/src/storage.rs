// [[KERNEL]]/apps/agent-kernel/src/storage.rs
// Purpose: JSON persistence under the memory storage root.
// Architecture: Infrastructure Helper Layer.
// Dependencies: tokio::fs, serde_json

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Highest envelope version this build reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("Unsupported format version {found} in {path}")]
    UnsupportedVersion { path: PathBuf, found: u32 },
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// On-disk envelope wrapped around every persisted document.
#[derive(Debug, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub data: T,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Only ids made of alphanumerics, `-` and `_` become file names.
fn validate_key(key: &str) -> Result<&str, StorageError> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(key)
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage layout. Idempotent.
    pub async fn init(&self) -> Result<(), StorageError> {
        for dir in ["sessions", "knowledge", "context"] {
            let path = self.root.join(dir);
            fs::create_dir_all(&path).await.map_err(io_error(&path))?;
        }
        tracing::info!("Memory storage ready at {}", self.root.display());
        Ok(())
    }

    pub fn session_path(&self, session_id: &str) -> Result<PathBuf, StorageError> {
        let key = validate_key(session_id)?;
        Ok(self.root.join("sessions").join(format!("{}.json", key)))
    }

    pub fn knowledge_path(&self) -> PathBuf {
        self.root.join("knowledge").join("base.json")
    }

    pub fn context_path(&self) -> PathBuf {
        self.root.join("context").join("cache.json")
    }

    pub async fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        fs::try_exists(path).await.map_err(io_error(path))
    }

    /// Reads an enveloped document. A missing or empty file is `Ok(None)`.
    pub async fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StorageError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(path)(e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let corrupt = |reason: String| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let raw: Value = serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        let version = raw
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| corrupt("missing format version".to_string()))?;

        if version > u64::from(FORMAT_VERSION) {
            return Err(StorageError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: u32::try_from(version).unwrap_or(u32::MAX),
            });
        }

        let envelope: Versioned<T> = serde_json::from_value(raw).map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(envelope.data))
    }

    /// Writes through a sibling temp file and a rename so readers never see a
    /// half-written document.
    pub async fn write<T: Serialize>(&self, path: &Path, data: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }

        let envelope = Versioned {
            version: FORMAT_VERSION,
            saved_at: Utc::now(),
            data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope).map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes).await.map_err(io_error(&tmp_path))?;
        fs::rename(&tmp_path, path).await.map_err(io_error(path))?;

        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    async fn store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, store) = store().await;
        let path = store.knowledge_path();
        let mut data = BTreeMap::new();
        data.insert("a".to_string(), 1u32);

        store.write(&path, &data).await.unwrap();
        let loaded: Option<BTreeMap<String, u32>> = store.read(&path).await.unwrap();
        assert_eq!(loaded, Some(data));
        assert!(!path.with_extension("json.tmp").exists());

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], FORMAT_VERSION);
    }

    #[tokio::test]
    async fn test_missing_and_empty_files_read_as_none() {
        let (_dir, store) = store().await;
        let path = store.context_path();
        assert!(store.read::<Value>(&path).await.unwrap().is_none());

        std::fs::write(&path, "  \n").unwrap();
        assert!(store.read::<Value>(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_and_future_files_rejected() {
        let (_dir, store) = store().await;
        let path = store.knowledge_path();

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            store.read::<Value>(&path).await,
            Err(StorageError::Corrupt { .. })
        ));

        std::fs::write(&path, r#"{"a": 1}"#).unwrap();
        assert!(matches!(
            store.read::<Value>(&path).await,
            Err(StorageError::Corrupt { .. })
        ));

        std::fs::write(&path, r#"{"version": 99, "saved_at": "2024-01-01T00:00:00Z", "data": {}}"#).unwrap();
        assert!(matches!(
            store.read::<Value>(&path).await,
            Err(StorageError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_session_keys_are_validated() {
        let store = JsonStore::new("/tmp/unused");
        assert!(store.session_path("session_20240101_120000_alice").is_ok());
        assert!(matches!(
            store.session_path("../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(store.session_path("").is_err());
    }
}
