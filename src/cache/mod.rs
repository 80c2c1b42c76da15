//! Cache Module
//!
//! Provides in-memory caching with per-entry expiry and sliding TTL refresh.
//!
//! Entries are evicted in expiration order, never by access recency: reads
//! push an entry's expiry forward, and both the sweep and the capacity bound
//! remove whatever expires soonest.

mod entry;
mod handle;
mod queue;
mod stats;
mod store;


// Re-export public types
pub use entry::{Entry, EntryArena, EntryId};
pub use handle::{Cache, CacheStatus};
pub(crate) use handle::SharedState;
pub use queue::{expires_before, ExpiryQueue};
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
