//! Store Module
//!
//! The file-persisted cache adapter. Every read and write is served from
//! memory; mutations request a debounced snapshot flush through the
//! [`FlushScheduler`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{resolve_ttl, CacheState, Entry, GlobMatcher, KeyMatcher, Lookup, Snapshot};
use crate::clock::{Clock, SystemClock};
use crate::codec::{Codec, JsonCodec};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::{FileStorage, Storage};
use crate::tasks::{FlushHandle, FlushScheduler, FlushTarget};

/// Adapter name reported by [`SimpleStore::name`].
pub const ADAPTER_NAME: &str = "file";

// == Store Builder ==
/// Assembles a [`SimpleStore`] with pluggable collaborators.
///
/// Anything not set falls back to: [`FileStorage`] at `config.file`,
/// [`JsonCodec`], [`GlobMatcher`] and [`SystemClock`].
#[derive(Debug)]
pub struct StoreBuilder {
    config: Config,
    codec: Option<Arc<dyn Codec>>,
    storage: Option<Arc<dyn Storage>>,
    matcher: Option<Arc<dyn KeyMatcher>>,
    clock: Option<Arc<dyn Clock>>,
}

impl StoreBuilder {
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    pub fn matcher(mut self, matcher: impl KeyMatcher + 'static) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Validates the configuration, loads the prior snapshot and returns the
    /// ready store.
    ///
    /// A missing, unreadable or corrupt snapshot is not an error: the store
    /// starts empty.
    pub async fn open(self) -> Result<SimpleStore> {
        self.config.validate()?;

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(FileStorage::new(self.config.file.clone())));
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec::new()));
        let matcher = self.matcher.unwrap_or_else(|| Arc::new(GlobMatcher));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let state = load_state(storage.as_ref(), codec.as_ref(), clock.now_ms()).await;
        info!(
            location = %storage.location(),
            entries = state.len(),
            "Cache store opened"
        );

        Ok(SimpleStore {
            inner: Arc::new(Inner {
                scheduler: FlushScheduler::new(self.config.write_delay_duration()),
                config: self.config,
                state: RwLock::new(state),
                codec,
                storage,
                matcher,
                clock,
            }),
        })
    }
}

/// Reads and decodes the persisted snapshot, or starts empty.
async fn load_state(storage: &dyn Storage, codec: &dyn Codec, now: u64) -> CacheState {
    let loaded = async {
        let raw = storage.read().await?;
        Snapshot::from_value(codec.decode(raw)?)
    }
    .await;

    match loaded {
        Ok(snapshot) => CacheState::from_snapshot(snapshot, now),
        Err(CacheError::SnapshotMissing(location)) => {
            debug!(%location, "No snapshot yet, starting empty");
            CacheState::new(now)
        }
        Err(err) => {
            warn!(
                location = %storage.location(),
                error = %err,
                "Discarding unreadable snapshot, starting empty"
            );
            CacheState::new(now)
        }
    }
}

// == Simple Store ==
/// File-persisted key-value cache with per-entry TTL.
///
/// Cheap to clone; clones share the same cache. Values are stored as JSON
/// values, and the typed accessors convert through serde.
#[derive(Debug, Clone)]
pub struct SimpleStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: Config,
    state: RwLock<CacheState>,
    codec: Arc<dyn Codec>,
    storage: Arc<dyn Storage>,
    matcher: Arc<dyn KeyMatcher>,
    clock: Arc<dyn Clock>,
    scheduler: FlushScheduler,
}

#[async_trait]
impl FlushTarget for Inner {
    async fn flush(&self) -> Result<()> {
        let now = self.clock.now_ms();
        let payload = {
            let mut state = self.state.write().await;
            let swept = state.sweep(now, self.config.expires_check_interval);
            if swept > 0 {
                debug!(
                    swept,
                    last_sweep_at = state.last_sweep_at(),
                    "Expired entries removed before flush"
                );
            }
            self.codec.encode(&state.to_snapshot()?)?
        };

        self.storage.write(&payload).await?;
        debug!(
            location = %self.storage.location(),
            bytes = payload.len(),
            "Snapshot flushed"
        );
        Ok(())
    }
}

impl SimpleStore {
    // == Constructors ==
    /// Opens a store with default collaborators for `config`.
    pub async fn open(config: Config) -> Result<Self> {
        Self::builder(config).open().await
    }

    pub fn builder(config: Config) -> StoreBuilder {
        StoreBuilder {
            config,
            codec: None,
            storage: None,
            matcher: None,
            clock: None,
        }
    }

    pub fn name(&self) -> &'static str {
        ADAPTER_NAME
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    fn now(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    // == Get ==
    /// Returns the value stored under `key`, or None if it is missing or
    /// expired. Reading an expired key removes it and requests a flush.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        let lookup = self.inner.state.write().await.lookup(key, self.now());
        self.after_lookup(key, lookup).await
    }

    /// Typed [`get_value`](Self::get_value).
    ///
    /// A stored value that does not deserialize into `T` is logged and read
    /// as None; the entry itself is left in place.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        decode_value(key, value)
    }

    async fn after_lookup(&self, key: &str, lookup: Lookup) -> Option<Value> {
        if lookup.evicted() {
            debug!(key, "Expired entry removed on read");
            self.save().await;
        }
        lookup.into_value()
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// `ttl` is in seconds; None or zero falls back to the configured default
    /// TTL, and with no default the entry never expires.
    pub async fn set_value(&self, key: impl Into<String>, value: Value, ttl: Option<u64>) {
        let entry = Entry::with_ttl(value, resolve_ttl(ttl, self.inner.config.ttl), self.now());
        self.inner.state.write().await.insert(key.into(), entry);
        self.save().await;
    }

    /// Typed [`set_value`](Self::set_value).
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: impl Into<String>,
        value: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value, ttl).await;
        Ok(())
    }

    // == Delete ==
    /// Removes `key`. Returns 1 if it was present, else 0.
    ///
    /// A flush is requested either way.
    pub async fn del(&self, key: &str) -> usize {
        let removed = self.inner.state.write().await.remove(key);
        self.save().await;
        usize::from(removed)
    }

    // == Get and Delete ==
    /// Removes `key` and returns its live value, if any.
    pub async fn getdel_value(&self, key: &str) -> Option<Value> {
        let lookup = {
            let mut state = self.inner.state.write().await;
            let lookup = state.lookup(key, self.now());
            state.remove(key);
            lookup
        };
        self.save().await;
        lookup.into_value()
    }

    /// Typed [`getdel_value`](Self::getdel_value).
    pub async fn getdel<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.getdel_value(key).await?;
        decode_value(key, value)
    }

    // == Get and Set ==
    /// Stores `value` under `key` with the default TTL and returns the
    /// previous live value, if any.
    pub async fn getset_value(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        let now = self.now();
        let entry = Entry::with_ttl(value, self.inner.config.ttl, now);
        let old = {
            let mut state = self.inner.state.write().await;
            let old = state.lookup(&key, now);
            state.insert(key, entry);
            old
        };
        self.save().await;
        old.into_value()
    }

    /// Typed [`getset_value`](Self::getset_value).
    pub async fn getset<T>(&self, key: impl Into<String>, value: &T) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = key.into();
        let value = serde_json::to_value(value)?;
        let old = self.getset_value(key.clone(), value).await;
        Ok(old.and_then(|old| decode_value(&key, old)))
    }

    // == Has ==
    /// True iff [`get_value`](Self::get_value) would return a value now.
    pub async fn has(&self, key: &str) -> bool {
        self.get_value(key).await.is_some()
    }

    // == Keys ==
    /// Lists live keys in insertion order, optionally filtered by a glob
    /// pattern. `None` and `"*"` select every key.
    ///
    /// Expired entries are skipped but not removed.
    pub async fn keys(&self, pattern: Option<&str>) -> Vec<String> {
        let now = self.now();
        self.inner
            .state
            .read()
            .await
            .keys(pattern, self.inner.matcher.as_ref(), now)
    }

    // == Clear ==
    /// Removes every entry, or the live entries matching `pattern`, and
    /// restarts the sweep clock. Returns the number removed.
    pub async fn clear(&self, pattern: Option<&str>) -> usize {
        let now = self.now();
        let removed = self
            .inner
            .state
            .write()
            .await
            .clear(pattern, self.inner.matcher.as_ref(), now);
        debug!(removed, pattern = pattern.unwrap_or("*"), "Cache cleared");
        self.save().await;
        removed
    }

    // == Sweep ==
    /// Runs the periodic sweep now if its interval has elapsed.
    ///
    /// Returns the number of expired entries removed. Flushes run this on
    /// their own; calling it directly does not request a flush.
    pub async fn clear_expired_items(&self) -> usize {
        let now = self.now();
        self.inner
            .state
            .write()
            .await
            .sweep(now, self.inner.config.expires_check_interval)
    }

    // == Persistence ==
    /// Requests a debounced flush and returns its handle.
    pub async fn save(&self) -> FlushHandle {
        self.inner.scheduler.request(Arc::clone(&self.inner)).await
    }

    /// Waits for the pending or in-flight flush, if any.
    pub async fn flushed(&self) -> Result<()> {
        match self.inner.scheduler.current().await {
            Some(handle) => handle.wait().await,
            None => Ok(()),
        }
    }

    /// Writes the current state immediately, bypassing the debounce delay.
    ///
    /// Does not run the sweep. Waits for any flush that is already writing.
    pub async fn write_now(&self) -> Result<()> {
        let _writing = self.inner.scheduler.lock_writes().await;
        let payload = {
            let state = self.inner.state.read().await;
            self.inner.codec.encode(&state.to_snapshot()?)?
        };
        self.inner.storage.write(&payload).await
    }

    /// Requests a final flush and returns its handle.
    ///
    /// The store remains usable; await the handle to know the snapshot is on
    /// storage.
    pub async fn close(&self) -> FlushHandle {
        info!(location = %self.inner.storage.location(), "Closing cache store");
        self.save().await
    }

    // == Introspection ==
    /// Number of entries held, including expired ones not yet removed.
    pub async fn len(&self) -> usize {
        self.inner.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.read().await.is_empty()
    }
}

fn decode_value<T: DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(key, error = %err, "Stored value does not match requested type");
            None
        }
    }
}
