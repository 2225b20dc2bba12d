//! kvs_simple - A file-persisted key-value cache
//!
//! Serves reads and writes from memory with per-entry TTL expiration, and
//! persists the whole cache as one snapshot through debounced, coalesced
//! writes.
//!
//! ```no_run
//! use kvs_simple::{Config, SimpleStore};
//!
//! # async fn demo() -> kvs_simple::Result<()> {
//! let store = SimpleStore::open(Config::default().with_file("/tmp/kvs/app.json")).await?;
//! store.set("greeting", "hello", Some(60)).await?;
//! assert_eq!(store.get::<String>("greeting").await.as_deref(), Some("hello"));
//! store.close().await.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod storage;
pub mod store;
pub mod tasks;

pub use cache::{Entry, GlobMatcher, KeyMatcher};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Blob, Codec, JsonCodec};
pub use config::Config;
pub use error::{CacheError, Result};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{SimpleStore, StoreBuilder};
pub use tasks::FlushHandle;
