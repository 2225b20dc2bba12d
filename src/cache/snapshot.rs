//! Snapshot Module
//!
//! The persisted form of the cache state:
//!
//! ```json
//! {"cache": [["key", {"expire": 1700000000000, "value": "bar"}]], "lastCheckAt": 1700000000000}
//! ```
//!
//! Older snapshots may store `cache` as an object of key -> entry; those are
//! read back as pairs in document order.

use std::fmt;

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::Entry;
use crate::error::{CacheError, Result};

// == Snapshot ==
/// Owned snapshot as decoded from storage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Snapshot {
    /// Entries in enumeration order
    #[serde(deserialize_with = "pairs_or_map")]
    pub cache: Vec<(String, Entry)>,
    /// Last time a full expiration sweep ran (Unix milliseconds)
    #[serde(rename = "lastCheckAt", default)]
    pub last_check_at: Option<u64>,
}

impl Snapshot {
    /// Interprets a decoded document as a snapshot.
    pub fn from_value(document: Value) -> Result<Self> {
        serde_json::from_value(document).map_err(|e| CacheError::Snapshot(e.to_string()))
    }
}

// == Snapshot View ==
/// Borrowed view of the live state, used for encoding without cloning values.
#[derive(Debug, Serialize)]
pub struct SnapshotView<'a> {
    pub cache: Vec<(&'a str, &'a Entry)>,
    #[serde(rename = "lastCheckAt")]
    pub last_check_at: u64,
}

impl SnapshotView<'_> {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// == Entries Deserializer ==
fn pairs_or_map<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, Entry)>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(EntriesVisitor)
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = Vec<(String, Entry)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of [key, entry] pairs or a map of key to entry")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(pair) = seq.next_element::<(String, Entry)>()? {
            entries.push(pair);
        }
        Ok(entries)
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(pair) = map.next_entry::<String, Entry>()? {
            entries.push(pair);
        }
        Ok(entries)
    }
}
