//! In-memory store for tests and ephemeral runs.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::{Collection, Collections, KeyValueStore, StorageError};

/// Volatile [`KeyValueStore`]. Clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with collections (e.g. an older saved state).
    pub fn with_contents(contents: Collections) -> Self {
        Self { inner: Arc::new(RwLock::new(contents)) }
    }

    /// Copy of everything stored.
    pub async fn dump(&self) -> Collections {
        self.inner.read().await.clone()
    }
}

impl KeyValueStore for MemoryStore {
    async fn read(&self, collections: &[Collection]) -> Result<Collections, StorageError> {
        let inner = self.inner.read().await;
        Ok(collections
            .iter()
            .filter_map(|c| inner.get(c).map(|v| (*c, v.clone())))
            .collect())
    }

    async fn commit(&self, puts: Collections) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.extend(puts);
        Ok(())
    }
}
