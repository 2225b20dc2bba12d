//! Storage Module
//!
//! Backends that hold the encoded snapshot as one opaque blob.
//!
//! # Backends
//! - [`FileStorage`]: a file on the local filesystem, replaced atomically
//! - [`MemoryStorage`]: an in-process buffer, shared between clones

mod file;
mod memory;

use std::fmt;

use async_trait::async_trait;

use crate::codec::Blob;
use crate::error::Result;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// == Storage Trait ==
/// Reads and writes the whole snapshot blob.
#[async_trait]
pub trait Storage: Send + Sync + fmt::Debug {
    /// Human-readable address of the blob, used in logs and errors.
    fn location(&self) -> String;

    /// Reads the full blob, as raw bytes or as an already parsed document.
    ///
    /// Returns [`CacheError::SnapshotMissing`](crate::error::CacheError::SnapshotMissing)
    /// when nothing has been written yet.
    async fn read(&self) -> Result<Blob>;

    /// Replaces the full blob.
    async fn write(&self, data: &[u8]) -> Result<()>;
}
