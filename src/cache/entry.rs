//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A single cached value plus its optional absolute expiration instant.
///
/// Serialized as `{"expire": <ms>, "value": <any>}`, with `expire` omitted
/// for entries that never expire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<V = Value> {
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<u64>,
    /// The stored value; required, `null` included
    pub value: V,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates an entry that expires at the given absolute instant.
    pub fn new(value: V, expire: Option<u64>) -> Self {
        Self { expire, value }
    }

    /// Creates an entry whose expiration is `ttl_seconds` after `now`.
    ///
    /// A TTL of zero means no expiration.
    pub fn with_ttl(value: V, ttl_seconds: Option<u64>, now: u64) -> Self {
        Self::new(value, expire_at(now, ttl_seconds))
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its expiration time.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expire {
            Some(expire) => expire <= now,
            None => false,
        }
    }
}

// == TTL Conversion ==
/// Converts a TTL in whole seconds into an absolute expiration instant.
pub fn expire_at(now: u64, ttl_seconds: Option<u64>) -> Option<u64> {
    ttl_seconds
        .filter(|ttl| *ttl > 0)
        .map(|ttl| now.saturating_add(ttl.saturating_mul(1000)))
}

/// Picks the TTL for a write: the explicit one, else the store default.
///
/// An explicit TTL of zero counts as "not given" and falls through to the
/// default, the same as an absent one.
pub fn resolve_ttl(explicit: Option<u64>, default: Option<u64>) -> Option<u64> {
    explicit
        .filter(|ttl| *ttl > 0)
        .or(default)
        .filter(|ttl| *ttl > 0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = Entry::with_ttl(json!("test_value"), None, NOW);

        assert_eq!(entry.value, json!("test_value"));
        assert!(entry.expire.is_none());
        assert!(!entry.is_expired_at(NOW));
        assert!(!entry.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = Entry::with_ttl(json!("test_value"), Some(60), NOW);

        assert_eq!(entry.expire, Some(NOW + 60_000));
        assert!(!entry.is_expired_at(NOW));
        assert!(!entry.is_expired_at(NOW + 59_999));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = Entry::new(json!("test"), Some(NOW));

        // Entry should be expired when current time >= expire
        assert!(entry.is_expired_at(NOW), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(NOW - 1));
    }

    #[test]
    fn test_zero_ttl_is_no_expiration() {
        // Zero is treated like an absent TTL, not as "expire immediately"
        let entry = Entry::with_ttl(json!(1), Some(0), NOW);
        assert!(entry.expire.is_none());
        assert!(!entry.is_expired_at(NOW + 1_000_000));
    }

    #[test]
    fn test_resolve_ttl_falls_back_to_default() {
        assert_eq!(resolve_ttl(Some(5), Some(60)), Some(5));
        assert_eq!(resolve_ttl(None, Some(60)), Some(60));
        assert_eq!(resolve_ttl(Some(0), Some(60)), Some(60));
        assert_eq!(resolve_ttl(Some(0), None), None);
        assert_eq!(resolve_ttl(None, Some(0)), None);
    }

    #[test]
    fn test_entry_serialization_layout() {
        let entry = Entry::new(json!("bar"), Some(42));
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"expire": 42, "value": "bar"})
        );

        let forever = Entry::new(json!({"a": 1}), None);
        assert_eq!(
            serde_json::to_value(&forever).unwrap(),
            json!({"value": {"a": 1}})
        );
    }

    #[test]
    fn test_entry_deserialize_without_expire() {
        let entry: Entry = serde_json::from_value(json!({"value": [1, 2]})).unwrap();
        assert_eq!(entry, Entry::new(json!([1, 2]), None));
    }

    #[test]
    fn test_entry_requires_value_field() {
        assert!(serde_json::from_value::<Entry>(json!({})).is_err());
        assert!(serde_json::from_value::<Entry>(json!({"expire": 5})).is_err());

        let null: Entry = serde_json::from_value(json!({"value": null})).unwrap();
        assert_eq!(null, Entry::new(Value::Null, None));
    }
}
