//! Configuration Module
//!
//! Handles loading and managing store configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{CacheError, Result};

/// Default interval between full expiration sweeps (24 hours, in milliseconds).
pub const DEFAULT_EXPIRES_CHECK_INTERVAL_MS: u64 = 24 * 3600 * 1000;

/// Default debounce delay before a scheduled snapshot write (milliseconds).
pub const DEFAULT_WRITE_DELAY_MS: u64 = 100;

/// Store configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Location of the snapshot file
    pub file: PathBuf,
    /// Default TTL in seconds for entries set without an explicit TTL
    pub ttl: Option<u64>,
    /// Minimum time between full expiration sweeps, in milliseconds
    pub expires_check_interval: u64,
    /// Debounce delay for snapshot writes, in milliseconds
    pub write_delay: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `KVS_FILE` - Snapshot file path (default: random file under `<tmp>/kvs/`)
    /// - `KVS_TTL` - Default TTL in seconds (default: none)
    /// - `KVS_EXPIRES_CHECK_INTERVAL` - Sweep interval in ms (default: 86400000)
    /// - `KVS_WRITE_DELAY` - Write debounce delay in ms (default: 100)
    pub fn from_env() -> Self {
        Self {
            file: env::var("KVS_FILE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_file),
            ttl: env::var("KVS_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ttl| *ttl > 0),
            expires_check_interval: env::var("KVS_EXPIRES_CHECK_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXPIRES_CHECK_INTERVAL_MS),
            write_delay: env::var("KVS_WRITE_DELAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_WRITE_DELAY_MS),
        }
    }

    /// Sets the snapshot file location.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    /// Sets the default TTL in seconds. Zero means no default TTL.
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl).filter(|ttl| *ttl > 0);
        self
    }

    /// Sets the sweep interval in milliseconds.
    pub fn with_expires_check_interval(mut self, interval_ms: u64) -> Self {
        self.expires_check_interval = interval_ms;
        self
    }

    /// Sets the write debounce delay in milliseconds.
    pub fn with_write_delay(mut self, delay_ms: u64) -> Self {
        self.write_delay = delay_ms;
        self
    }

    pub fn write_delay_duration(&self) -> Duration {
        Duration::from_millis(self.write_delay)
    }

    /// Checks the configuration before a store is opened with it.
    pub fn validate(&self) -> Result<()> {
        if self.file.as_os_str().is_empty() {
            return Err(CacheError::InvalidConfig(
                "snapshot file location cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: default_file(),
            ttl: None,
            expires_check_interval: DEFAULT_EXPIRES_CHECK_INTERVAL_MS,
            write_delay: DEFAULT_WRITE_DELAY_MS,
        }
    }
}

/// Random snapshot path under the platform temp directory.
fn default_file() -> PathBuf {
    env::temp_dir()
        .join("kvs")
        .join(format!("{}.json", Uuid::new_v4().simple()))
}
