//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache name, used as the snapshot file stem
    pub name: String,
    /// Maximum number of entries the cache can hold (0 = unbounded)
    pub max_entries: usize,
    /// TTL for entries set without an explicit one (None = never expire)
    pub default_ttl: Option<Duration>,
    /// Idle wait between sweep cycles
    pub sweep_interval: Duration,
    /// Write a snapshot when the cache is closed
    pub persist_on_close: bool,
    /// Directory the snapshot file is written to
    pub snapshot_dir: PathBuf,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAME` - Cache name (default: "cache_data")
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 = never expire (default: 300)
    /// - `SWEEP_INTERVAL_MS` - Sweep idle wait in milliseconds (default: 100)
    /// - `PERSIST_ON_CLOSE` - Write a snapshot on close (default: false)
    /// - `SNAPSHOT_DIR` - Snapshot directory (default: ".")
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            name: env::var("CACHE_NAME").unwrap_or(defaults.name),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: match parse_var::<u64>("DEFAULT_TTL") {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.default_ttl,
            },
            sweep_interval: parse_var("SWEEP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.sweep_interval),
            persist_on_close: parse_var("PERSIST_ON_CLOSE").unwrap_or(defaults.persist_on_close),
            snapshot_dir: env::var("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_dir),
        }
    }

    /// Sets the cache name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the capacity bound.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the default TTL.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the idle wait between sweep cycles.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Enables or disables the snapshot on close.
    pub fn with_persist_on_close(mut self, persist: bool) -> Self {
        self.persist_on_close = persist;
        self
    }

    /// Sets the snapshot directory.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// Path of the snapshot file for this cache.
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_dir.join(format!("{}.json", self.name))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "cache_data".to_string(),
            max_entries: 1000,
            default_ttl: Some(Duration::from_secs(300)),
            sweep_interval: Duration::from_millis(100),
            persist_on_close: false,
            snapshot_dir: PathBuf::from("."),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.name, "cache_data");
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.sweep_interval, Duration::from_millis(100));
        assert!(!config.persist_on_close);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_NAME");
        env::remove_var("MAX_ENTRIES");
        env::remove_var("DEFAULT_TTL");
        env::remove_var("SWEEP_INTERVAL_MS");
        env::remove_var("PERSIST_ON_CLOSE");
        env::remove_var("SNAPSHOT_DIR");

        let config = CacheConfig::from_env();
        assert_eq!(config.name, "cache_data");
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.sweep_interval, Duration::from_millis(100));
        assert!(!config.persist_on_close);
        assert_eq!(config.snapshot_dir, PathBuf::from("."));
    }

    #[test]
    fn test_config_builder_and_snapshot_path() {
        let config = CacheConfig::default()
            .with_name("sessions")
            .with_max_entries(2)
            .with_default_ttl(None)
            .with_snapshot_dir("/tmp/snapshots");

        assert_eq!(config.max_entries, 2);
        assert!(config.default_ttl.is_none());
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/tmp/snapshots/sessions.json")
        );
    }
}
