//! File-backed snapshot storage.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::codec::Blob;
use crate::error::{CacheError, Result};
use crate::storage::Storage;

// == File Storage ==
/// Stores the snapshot in a single file.
///
/// Missing parent directories are created on write. Each write goes to a
/// sibling temp file that is then renamed over the target, so readers see
/// either the old or the new snapshot.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> Result<Blob> {
        let raw = fs::read(&self.path).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => CacheError::SnapshotMissing(self.location()),
            _ => CacheError::Storage(format!("failed to read {}: {}", self.location(), err)),
        })?;
        Ok(Blob::Bytes(raw))
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|err| {
                CacheError::Storage(format!("failed to create {}: {}", parent.display(), err))
            })?;
        }

        let temp = self.temp_path();
        fs::write(&temp, data).await.map_err(|err| {
            CacheError::Storage(format!("failed to write {}: {}", temp.display(), err))
        })?;
        fs::rename(&temp, &self.path).await.map_err(|err| {
            CacheError::Storage(format!("failed to replace {}: {}", self.location(), err))
        })?;

        debug!(location = %self.location(), bytes = data.len(), "Snapshot file replaced");
        Ok(())
    }
}
