//! Durable Storage
//!
//! Three named collections (grid cells, meta, users) behind an async
//! key-value interface. A commit writes every collection it is given as one
//! unit, so cells and meta can never be saved out of step.

pub mod memory;
pub mod file;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use serde::{Serialize, Deserialize};

pub use memory::MemoryStore;
pub use file::FileStore;

/// Collection name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Cells keyed by id.
    Grid,
    /// Board meta.
    Meta,
    /// User roster.
    Users,
}

impl Collection {
    /// Every collection.
    pub const ALL: [Collection; 3] = [Collection::Grid, Collection::Meta, Collection::Users];

    /// Stored name.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Grid => "grid",
            Collection::Meta => "meta",
            Collection::Users => "users",
        }
    }
}

/// Collection contents keyed by collection.
pub type Collections = BTreeMap<Collection, serde_json::Value>;

/// Storage faults.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Cause.
        #[source]
        source: std::io::Error,
    },

    /// Stored bytes are not valid JSON for the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document checksum does not match its contents.
    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum in the document.
        stored: String,
        /// Checksum of the contents.
        computed: String,
    },

    /// Document written by an unknown format revision.
    #[error("unsupported store format {0}")]
    UnsupportedFormat(u32),
}

/// Async key-value store over [`Collection`]s.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the requested collections. Absent ones are left out of the map.
    fn read(
        &self,
        collections: &[Collection],
    ) -> impl Future<Output = Result<Collections, StorageError>> + Send;

    /// Replace the given collections atomically. Others are untouched.
    fn commit(&self, puts: Collections) -> impl Future<Output = Result<(), StorageError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        for c in Collection::ALL {
            let json = serde_json::to_value(c).unwrap();
            assert_eq!(json, serde_json::Value::String(c.as_str().to_string()));
        }
    }

    #[test]
    fn test_collections_serialize_as_object() {
        let mut map = Collections::new();
        map.insert(Collection::Meta, serde_json::json!({"version": 1}));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"meta":{"version":1}}"#);
    }
}
