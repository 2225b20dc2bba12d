//! Cache Module
//!
//! In-memory cache state with TTL expiration, key ordering, glob selection
//! and the snapshot layout it persists as.

mod entry;
mod order;
mod pattern;
mod snapshot;
mod state;
mod sweep;


// Re-export public types
pub use entry::{expire_at, resolve_ttl, Entry};
pub use order::KeyOrder;
pub use pattern::{GlobMatcher, KeyMatcher, MATCH_ALL};
pub use snapshot::{Snapshot, SnapshotView};
pub use state::{CacheState, Lookup};
pub use sweep::{plan_sweep, SweepPlan};
