//! File-backed store.
//!
//! All collections live in one JSON document:
//!
//! ```text
//! { "format": 1, "checksum": "<sha256 hex>", "collections": { "grid": ..., "meta": ..., "users": ... } }
//! ```
//!
//! The checksum covers the serialized `collections` object. Commits write a
//! temp file next to the target, sync it to disk and rename it over, so a
//! crash leaves either the old document or the new one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::hash::document_checksum;
use crate::store::{Collection, Collections, KeyValueStore, StorageError};

/// Current document format.
pub const FORMAT_VERSION: u32 = 1;

/// File name used inside a data directory.
pub const DEFAULT_FILE_NAME: &str = "reveal-grid.json";

#[derive(Serialize, Deserialize)]
struct Document {
    format: u32,
    checksum: String,
    collections: Collections,
}

/// Single-document JSON store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Store at `<dir>/reveal-grid.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    /// Document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io { path: self.path.clone(), source }
    }

    async fn load(&self) -> Result<Collections, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Collections::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        let doc: Document = serde_json::from_slice(&bytes)?;
        if doc.format != FORMAT_VERSION {
            return Err(StorageError::UnsupportedFormat(doc.format));
        }
        let computed = document_checksum(&serde_json::to_vec(&doc.collections)?);
        if computed != doc.checksum {
            return Err(StorageError::ChecksumMismatch { stored: doc.checksum, computed });
        }
        Ok(doc.collections)
    }

    async fn save(&self, collections: Collections) -> Result<(), StorageError> {
        let body = serde_json::to_vec(&collections)?;
        let doc = Document {
            format: FORMAT_VERSION,
            checksum: document_checksum(&body),
            collections,
        };
        let text = serde_json::to_vec_pretty(&doc)?;

        let dir = self.path.parent().unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(dir).await.map_err(|e| self.io_error(e))?;

        let base = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_FILE_NAME);
        let tmp = dir.join(format!(".{}.tmp-{}", base, uuid::Uuid::new_v4()));

        if let Err(e) = write_synced(&tmp, &text).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }
        debug!(path = %self.path.display(), bytes = text.len(), "store document written");
        Ok(())
    }
}

/// Write `bytes` and flush them to disk before returning.
async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

impl KeyValueStore for FileStore {
    async fn read(&self, collections: &[Collection]) -> Result<Collections, StorageError> {
        let mut all = self.load().await?;
        Ok(collections
            .iter()
            .filter_map(|c| all.remove(c).map(|v| (*c, v)))
            .collect())
    }

    async fn commit(&self, puts: Collections) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.load().await?;
        all.extend(puts);
        self.save(all).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("reveal-grid-store-{}", uuid::Uuid::new_v4()))
            .join(DEFAULT_FILE_NAME)
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let store = FileStore::new(temp_path());
        assert!(store.read(&Collection::ALL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_leaves_only_the_document() {
        let path = temp_path();
        let store = FileStore::new(&path);
        for version in 1..=3 {
            let mut puts = Collections::new();
            puts.insert(Collection::Meta, json!({"version": version}));
            store.commit(puts).await.unwrap();
        }

        let dir = path.parent().unwrap();
        let names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![DEFAULT_FILE_NAME.to_string()]);
        let got = store.read(&[Collection::Meta]).await.unwrap();
        assert_eq!(got[&Collection::Meta]["version"], 3);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_commit_and_reload() {
        let path = temp_path();
        let store = FileStore::new(&path);
        let mut puts = Collections::new();
        puts.insert(Collection::Meta, json!({"version": 3, "etag": "v-3"}));
        puts.insert(Collection::Users, json!([{"id": "u00001", "name": "Al", "played": false}]));
        store.commit(puts).await.unwrap();

        let reopened = FileStore::new(&path);
        let got = reopened.read(&[Collection::Meta]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[&Collection::Meta]["version"], 3);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_partial_commit_keeps_other_collections() {
        let path = temp_path();
        let store = FileStore::new(&path);
        let mut puts = Collections::new();
        puts.insert(Collection::Grid, json!({"r0-c0": {"id": "r0-c0"}}));
        puts.insert(Collection::Meta, json!({"version": 1}));
        store.commit(puts).await.unwrap();

        let mut meta = Collections::new();
        meta.insert(Collection::Meta, json!({"version": 2}));
        store.commit(meta).await.unwrap();

        let got = store.read(&Collection::ALL).await.unwrap();
        assert_eq!(got[&Collection::Meta]["version"], 2);
        assert!(got.contains_key(&Collection::Grid));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_tampered_document_is_rejected() {
        let path = temp_path();
        let store = FileStore::new(&path);
        let mut puts = Collections::new();
        puts.insert(Collection::Meta, json!({"version": 1}));
        store.commit(puts).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"version\": 1", "\"version\": 9")).unwrap();

        let err = store.read(&[Collection::Meta]).await.unwrap_err();
        assert!(matches!(err, StorageError::ChecksumMismatch { .. }));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_unknown_format_is_rejected() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"format": 7, "checksum": "", "collections": {}}"#).unwrap();

        let err = FileStore::new(&path).read(&Collection::ALL).await.unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedFormat(7)));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
