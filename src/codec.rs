//! Codec Module
//!
//! Turns the snapshot document into bytes for storage and back.

use std::fmt;

use serde_json::Value;

use crate::error::{CacheError, Result};

// == Blob ==
/// What a storage backend hands back on read.
///
/// File-like backends return raw bytes. Backends that keep documents in
/// structured form (a document database, an in-process map) can return the
/// document itself and skip parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Blob {
    Bytes(Vec<u8>),
    Document(Value),
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob::Bytes(bytes)
    }
}

impl From<Value> for Blob {
    fn from(document: Value) -> Self {
        Blob::Document(document)
    }
}

// == Codec Trait ==
/// Serializes snapshot documents.
pub trait Codec: Send + Sync + fmt::Debug {
    fn encode(&self, document: &Value) -> Result<Vec<u8>>;

    /// Decodes a stored blob. A blob that is already a document is
    /// returned as is.
    fn decode(&self, blob: Blob) -> Result<Value>;
}

// == JSON Codec ==
/// UTF-8 JSON, compact by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indents the written document for human inspection.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn encode(&self, document: &Value) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        Ok(bytes)
    }

    fn decode(&self, blob: Blob) -> Result<Value> {
        let raw = match blob {
            Blob::Document(document) => return Ok(document),
            Blob::Bytes(raw) => raw,
        };
        // Tolerate a UTF-8 byte order mark written by other tools
        let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw.as_slice());
        serde_json::from_slice(raw).map_err(|e| CacheError::Codec(e.to_string()))
    }
}
