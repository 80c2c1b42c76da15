//! Expiry Cache - an in-process key/value cache with expiring entries
//!
//! Every entry carries an expiration time; a background task removes expired
//! entries and reads extend an entry's lifetime (sliding TTL).

pub mod cache;
pub mod config;
pub mod error;
pub mod snapshot;
mod tasks;

pub use cache::{Cache, CacheStats, CacheStatus};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use snapshot::{JsonFileSink, Snapshot, SnapshotEntry, SnapshotSink};
