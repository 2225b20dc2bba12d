//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Variants carry rendered messages rather than source errors so that one
/// flush outcome can be cloned out to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No snapshot exists yet at the storage location
    #[error("Snapshot not found: {0}")]
    SnapshotMissing(String),

    /// The storage backend failed to read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encoding or decoding through the codec failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Decoded data does not have the snapshot layout
    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    /// The flush task went away without reporting an outcome
    #[error("Flush aborted before completion")]
    FlushAborted,

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Conversions ==
impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Codec(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_storage() {
        let err: CacheError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(matches!(err, CacheError::Storage(ref msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_json_error_maps_to_codec() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Codec(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::SnapshotMissing("/tmp/kvs/a.json".to_string());
        assert_eq!(err.to_string(), "Snapshot not found: /tmp/kvs/a.json");
        assert_eq!(
            CacheError::FlushAborted.to_string(),
            "Flush aborted before completion"
        );
    }
}
