//! Key Order Module
//!
//! Tracks the enumeration order of cache keys.

use std::collections::VecDeque;

// == Key Order ==
/// Remembers the order in which keys were first inserted.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest insertion
/// - Back = Newest insertion
///
/// Overwriting a key does not move it. A key that is removed and inserted
/// again goes to the back.
#[derive(Debug, Default, Clone)]
pub struct KeyOrder {
    order: VecDeque<String>,
}

impl KeyOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Push ==
    /// Appends a newly inserted key.
    ///
    /// The caller must not push a key that is already tracked.
    pub fn push(&mut self, key: String) {
        self.order.push_back(key);
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(index) = self.order.iter().position(|k| k == key) {
            self.order.remove(index);
        }
    }

    /// Keeps only the keys for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.order.retain(|k| keep(k));
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    /// Iterates keys from oldest to newest insertion.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }
}
