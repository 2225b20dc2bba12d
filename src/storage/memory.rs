//! In-process snapshot storage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::codec::Blob;
use crate::error::{CacheError, Result};
use crate::storage::Storage;

// == Memory Storage ==
/// Keeps the snapshot blob in memory.
///
/// Clones share the same blob and write counter, so a caller can hand one
/// clone to a store and inspect what it wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Arc<RwLock<Option<Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage that already holds `data`, as if written earlier.
    pub fn with_contents(data: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: Arc::new(RwLock::new(Some(data.into()))),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current blob, if any.
    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.blob.read().await.clone()
    }

    /// Number of writes performed since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn read(&self) -> Result<Blob> {
        self.blob
            .read()
            .await
            .clone()
            .map(Blob::Bytes)
            .ok_or_else(|| CacheError::SnapshotMissing(self.location()))
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        *self.blob.write().await = Some(data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
