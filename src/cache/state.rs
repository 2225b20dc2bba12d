//! Cache State Module
//!
//! The in-memory map behind a store: ordered entries, lazy expiration on read
//! and the rate-limited sweep. Every method takes the current time explicitly
//! and never touches storage; the async store decides when to persist.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::pattern::{KeyMatcher, MATCH_ALL};
use crate::cache::snapshot::{Snapshot, SnapshotView};
use crate::cache::sweep::plan_sweep;
use crate::cache::{Entry, KeyOrder};
use crate::error::Result;

// == Lookup ==
/// Result of reading a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The key is not in the map
    Missing,
    /// The key was present but expired; it has been removed
    Expired,
    /// The key holds a live value
    Live(Value),
}

impl Lookup {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Live(value) => Some(value),
            Lookup::Missing | Lookup::Expired => None,
        }
    }

    /// True when the read removed an entry and the map changed.
    pub fn evicted(&self) -> bool {
        matches!(self, Lookup::Expired)
    }
}

// == Cache State ==
/// Entries plus the last sweep time.
#[derive(Debug)]
pub struct CacheState {
    /// Key-value storage
    entries: HashMap<String, Entry>,
    /// Enumeration order of `entries`
    order: KeyOrder,
    /// Last full expiration sweep (Unix milliseconds)
    last_sweep_at: u64,
}

impl CacheState {
    // == Constructor ==
    /// Creates an empty state whose sweep clock starts at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            entries: HashMap::new(),
            order: KeyOrder::new(),
            last_sweep_at: now,
        }
    }

    /// Rebuilds state from a decoded snapshot.
    ///
    /// A key listed twice keeps its first position and its last entry. A
    /// snapshot without `lastCheckAt` starts the sweep clock at `now`.
    pub fn from_snapshot(snapshot: Snapshot, now: u64) -> Self {
        let mut state = Self::new(snapshot.last_check_at.unwrap_or(now));
        for (key, entry) in snapshot.cache {
            state.insert(key, entry);
        }
        state
    }

    /// Renders the state in snapshot layout.
    pub fn to_snapshot(&self) -> Result<Value> {
        let cache = self
            .order
            .iter()
            .filter_map(|key| self.entries.get(key).map(|entry| (key, entry)))
            .collect();

        SnapshotView {
            cache,
            last_check_at: self.last_sweep_at,
        }
        .to_value()
    }

    // == Lookup ==
    /// Reads a key, removing it if it has expired.
    pub fn lookup(&mut self, key: &str, now: u64) -> Lookup {
        let Some(entry) = self.entries.get(key) else {
            return Lookup::Missing;
        };
        if !entry.is_expired_at(now) {
            return Lookup::Live(entry.value.clone());
        }
        self.remove(key);
        Lookup::Expired
    }

    // == Insert ==
    /// Inserts or overwrites an entry.
    ///
    /// Returns the previous entry for the key, expired or not.
    pub fn insert(&mut self, key: String, entry: Entry) -> Option<Entry> {
        if let Some(existing) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(existing, entry));
        }
        self.order.push(key.clone());
        self.entries.insert(key, entry);
        None
    }

    // == Remove ==
    /// Removes a key. Returns true if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Keys ==
    /// Lists live keys in enumeration order, filtered by `pattern`.
    ///
    /// Expired entries are skipped but not removed.
    pub fn keys(&self, pattern: Option<&str>, matcher: &dyn KeyMatcher, now: u64) -> Vec<String> {
        let pattern = pattern.unwrap_or(MATCH_ALL);
        self.order
            .iter()
            .filter(|key| {
                self.entries
                    .get(*key)
                    .is_some_and(|entry| !entry.is_expired_at(now))
            })
            .filter(|key| pattern == MATCH_ALL || matcher.is_match(key, pattern))
            .map(str::to_string)
            .collect()
    }

    // == Clear ==
    /// Removes every entry, or the live entries `pattern` selects.
    ///
    /// Clearing everything counts expired entries still held in the map; a
    /// pattern clear counts only the live keys it removed. Either way the
    /// sweep clock restarts at `now`.
    pub fn clear(&mut self, pattern: Option<&str>, matcher: &dyn KeyMatcher, now: u64) -> usize {
        let count = match pattern {
            None | Some(MATCH_ALL) => {
                let count = self.entries.len();
                self.entries.clear();
                self.order.clear();
                count
            }
            Some(pattern) => self
                .keys(Some(pattern), matcher, now)
                .into_iter()
                .filter(|key| self.remove(key))
                .count(),
        };
        self.last_sweep_at = now;
        count
    }

    // == Sweep ==
    /// Removes every expired entry if the sweep interval has elapsed.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self, now: u64, interval_ms: u64) -> usize {
        let Some(plan) = plan_sweep(self.entries.iter(), now, self.last_sweep_at, interval_ms) else {
            return 0;
        };

        for key in &plan.expired {
            self.entries.remove(key);
        }
        self.order.retain(|key| self.entries.contains_key(key));
        self.last_sweep_at = plan.last_sweep_at;
        plan.expired.len()
    }

    pub fn last_sweep_at(&self) -> u64 {
        self.last_sweep_at
    }

    // == Length ==
    /// Returns the number of entries held, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GlobMatcher;
    use serde_json::json;

    const SEC: u64 = 1000;
    const HOUR: u64 = 3600 * SEC;
    const DAY: u64 = 24 * HOUR;
    const T0: u64 = 1_700_000_000_000;

    fn set(state: &mut CacheState, key: &str, value: Value, ttl: Option<u64>, now: u64) {
        state.insert(key.to_string(), Entry::with_ttl(value, ttl, now));
    }

    fn keys(state: &CacheState, pattern: Option<&str>, now: u64) -> Vec<String> {
        state.keys(pattern, &GlobMatcher, now)
    }

    #[test]
    fn test_state_new() {
        let state = CacheState::new(T0);
        assert_eq!(state.len(), 0);
        assert!(state.is_empty());
        assert_eq!(state.last_sweep_at(), T0);
    }

    #[test]
    fn test_lookup_missing() {
        let mut state = CacheState::new(T0);
        assert_eq!(state.lookup("nonexistent", T0), Lookup::Missing);
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut state = CacheState::new(T0);

        set(&mut state, "key1", json!("value1"), None, T0);

        assert_eq!(state.lookup("key1", T0), Lookup::Live(json!("value1")));
        assert_eq!(state.lookup("key1", T0 + 365 * DAY), Lookup::Live(json!("value1")));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_lookup_expired_removes_entry() {
        let mut state = CacheState::new(T0);
        set(&mut state, "key1", json!("value1"), Some(3), T0);

        assert_eq!(state.lookup("key1", T0 + 2_999), Lookup::Live(json!("value1")));

        let lookup = state.lookup("key1", T0 + 3 * SEC);
        assert_eq!(lookup, Lookup::Expired);
        assert!(lookup.evicted());
        assert!(state.is_empty());
        assert_eq!(state.lookup("key1", T0 + 3 * SEC), Lookup::Missing);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut state = CacheState::new(T0);

        set(&mut state, "a", json!(1), None, T0);
        set(&mut state, "b", json!(2), None, T0);
        let previous = state.insert("a".to_string(), Entry::new(json!(3), None));

        assert_eq!(previous, Some(Entry::new(json!(1), None)));
        assert_eq!(keys(&state, None, T0), vec!["a", "b"]);
        assert_eq!(state.lookup("a", T0), Lookup::Live(json!(3)));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_remove_and_reinsert_moves_to_end() {
        let mut state = CacheState::new(T0);

        set(&mut state, "a", json!(1), None, T0);
        set(&mut state, "b", json!(2), None, T0);
        assert!(state.remove("a"));
        assert!(!state.remove("a"));
        set(&mut state, "a", json!(1), None, T0);

        assert_eq!(keys(&state, None, T0), vec!["b", "a"]);
    }

    #[test]
    fn test_keys_skips_expired_without_removing() {
        let mut state = CacheState::new(T0);
        set(&mut state, "foo1", json!("bar"), Some(3), T0);
        set(&mut state, "foo2", json!("bar"), None, T0);

        assert_eq!(keys(&state, None, T0 + SEC), vec!["foo1", "foo2"]);
        assert_eq!(keys(&state, None, T0 + 4 * SEC), vec!["foo2"]);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_keys_with_pattern() {
        let mut state = CacheState::new(T0);
        for key in ["foo1", "bar", "foo2"] {
            set(&mut state, key, json!(key), None, T0);
        }

        assert_eq!(keys(&state, Some("foo*"), T0), vec!["foo1", "foo2"]);
        assert_eq!(keys(&state, Some("*"), T0), vec!["foo1", "bar", "foo2"]);
        assert!(keys(&state, Some("baz*"), T0).is_empty());
    }

    #[test]
    fn test_clear_all_counts_everything_and_resets_sweep() {
        let mut state = CacheState::new(T0);
        set(&mut state, "a", json!(1), Some(1), T0);
        set(&mut state, "b", json!(2), None, T0);

        let removed = state.clear(None, &GlobMatcher, T0 + 10 * SEC);

        assert_eq!(removed, 2);
        assert!(state.is_empty());
        assert!(keys(&state, None, T0 + 10 * SEC).is_empty());
        assert_eq!(state.last_sweep_at(), T0 + 10 * SEC);
    }

    #[test]
    fn test_clear_pattern_removes_only_matches() {
        let mut state = CacheState::new(T0);
        for key in ["foo1", "bar", "foo2"] {
            set(&mut state, key, json!(key), None, T0);
        }

        let removed = state.clear(Some("foo*"), &GlobMatcher, T0 + 1);

        assert_eq!(removed, 2);
        assert_eq!(keys(&state, None, T0 + 1), vec!["bar"]);
        assert_eq!(state.last_sweep_at(), T0 + 1);
    }

    #[test]
    fn test_sweep_rate_limited() {
        let mut state = CacheState::new(T0);
        set(&mut state, "short", json!(1), Some(1), T0);
        set(&mut state, "forever", json!(2), None, T0);

        // Expired, but the sweep interval has not elapsed
        assert_eq!(state.sweep(T0 + HOUR, DAY), 0);
        assert_eq!(state.len(), 2);
        assert_eq!(state.last_sweep_at(), T0);

        assert_eq!(state.sweep(T0 + DAY + 1, DAY), 1);
        assert_eq!(state.len(), 1);
        assert_eq!(keys(&state, None, T0 + DAY + 1), vec!["forever"]);
        assert_eq!(state.last_sweep_at(), T0 + DAY + 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut state = CacheState::new(T0);
        set(&mut state, "foo1", json!("bar"), Some(3), T0);
        set(&mut state, "foo2", json!({"n": 1}), None, T0);

        let document = state.to_snapshot().unwrap();
        assert_eq!(
            document,
            json!({
                "cache": [
                    ["foo1", {"expire": T0 + 3 * SEC, "value": "bar"}],
                    ["foo2", {"value": {"n": 1}}]
                ],
                "lastCheckAt": T0
            })
        );

        let restored = CacheState::from_snapshot(Snapshot::from_value(document).unwrap(), T0 + DAY);
        assert_eq!(restored.last_sweep_at(), T0);
        assert_eq!(keys(&restored, None, T0 + SEC), vec!["foo1", "foo2"]);
    }

    #[test]
    fn test_from_snapshot_defaults_sweep_clock_and_dedupes() {
        let snapshot = Snapshot {
            cache: vec![
                ("a".to_string(), Entry::new(json!(1), None)),
                ("b".to_string(), Entry::new(json!(2), None)),
                ("a".to_string(), Entry::new(json!(3), None)),
            ],
            last_check_at: None,
        };

        let mut state = CacheState::from_snapshot(snapshot, T0);

        assert_eq!(state.last_sweep_at(), T0);
        assert_eq!(keys(&state, None, T0), vec!["a", "b"]);
        assert_eq!(state.lookup("a", T0), Lookup::Live(json!(3)));
    }
}
