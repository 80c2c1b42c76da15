//! Cache Store Module
//!
//! Main cache engine combining the key index with the expiry queue.
//!
//! The store is not synchronized on its own; [`crate::cache::Cache`] wraps it
//! in a single mutex so that the index and the queue always change together.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::cache::entry::{expiry_from, Entry, EntryArena, EntryId};
use crate::cache::{CacheStats, ExpiryQueue, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};
use crate::snapshot::SnapshotEntry;

// == Cache Store ==
/// Key index and expiry queue sharing one entry arena.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key to entry handle
    index: HashMap<String, EntryId>,
    /// Entry storage
    arena: EntryArena<V>,
    /// Entries ordered by expiration time
    queue: ExpiryQueue,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed, 0 = unbounded
    max_entries: usize,
    /// TTL for entries without an explicit one, None = never expire
    default_ttl: Option<Duration>,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold, 0 = unbounded
    /// * `default_ttl` - TTL for entries set without one, None = never expire
    pub fn new(max_entries: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            index: HashMap::new(),
            arena: EntryArena::new(),
            queue: ExpiryQueue::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// If the key already exists, its value and expiry are updated in place
    /// and the entry is repositioned in the queue. If the cache is at
    /// capacity, the entry expiring soonest is evicted first.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL (uses the default TTL if None)
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>) -> Result<()> {
        self.set_at(key, value, ttl, Instant::now())
    }

    pub(crate) fn set_at(
        &mut self,
        key: String,
        value: V,
        ttl: Option<Duration>,
        now: Instant,
    ) -> Result<()> {
        validate_key(&key)?;

        let expire_at = expiry_from(now, ttl.or(self.default_ttl));

        if let Some(&id) = self.index.get(&key) {
            let entry = &mut self.arena[id];
            entry.value = value;
            entry.ttl = ttl;
            entry.expire_at = expire_at;
            self.queue.fix(&mut self.arena, id);
            return Ok(());
        }

        if self.max_entries > 0 && self.index.len() >= self.max_entries {
            self.evict_soonest();
        }

        let id = self.arena.insert(Entry::new(key.clone(), value, ttl, expire_at));
        self.queue.push(&mut self.arena, id);
        self.index.insert(key, id);
        self.stats.set_total_entries(self.index.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key, refreshing its expiry.
    ///
    /// A live entry gets `expire_at = now + ttl` where ttl is the entry's own
    /// TTL or the current default, so reads keep an entry alive. Entries whose
    /// expiry has already passed are removed and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let Some(&id) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if self.arena[id].is_expired_at(now) {
            self.remove_entry(id);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        let default_ttl = self.default_ttl;
        let entry = &mut self.arena[id];
        entry.expire_at = expiry_from(now, entry.ttl.or(default_ttl));
        let value = entry.value.clone();
        self.queue.fix(&mut self.arena, id);
        self.stats.record_hit();
        Some(value)
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns true if the key was present.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.index.get(key) {
            Some(&id) => {
                self.remove_entry(id);
                true
            }
            None => false,
        }
    }

    // == Default TTL ==
    /// Updates the default TTL.
    ///
    /// Existing entries keep their current expiry; the new default applies
    /// from their next refresh onwards.
    pub fn set_default_ttl(&mut self, ttl: Option<Duration>) {
        self.default_ttl = ttl;
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    // == Sweep Expired ==
    /// Removes every entry whose expiry has passed.
    ///
    /// Pops the queue minimum until it is live or the queue is empty.
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub(crate) fn sweep_expired_at(&mut self, now: Instant) -> usize {
        let mut removed = 0;

        while let Some(id) = self.queue.peek_min() {
            if !self.arena[id].is_expired_at(now) {
                break;
            }
            self.queue.pop_min(&mut self.arena);
            if let Some(entry) = self.arena.remove(id) {
                self.index.remove(&entry.key);
            }
            removed += 1;
        }

        if removed > 0 {
            self.stats.record_expirations(removed);
            self.stats.set_total_entries(self.index.len());
        }
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.index.len());
        stats
    }

    // == Snapshot ==
    /// Copies the live entries out with wall-clock expiry times.
    pub fn snapshot_entries(&self) -> Vec<SnapshotEntry<V>> {
        let now = Instant::now();
        let wall_now = Utc::now();

        self.index
            .values()
            .map(|&id| {
                let entry = &self.arena[id];
                SnapshotEntry {
                    key: entry.key.clone(),
                    value: entry.value.clone(),
                    expires_at: entry.ttl_remaining_at(now).and_then(|remaining| {
                        chrono::Duration::from_std(remaining)
                            .ok()
                            .and_then(|remaining| wall_now.checked_add_signed(remaining))
                    }),
                }
            })
            .collect()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Evicts the entry expiring soonest to make room for a new key.
    fn evict_soonest(&mut self) {
        if let Some(id) = self.queue.pop_min(&mut self.arena) {
            if let Some(entry) = self.arena.remove(id) {
                tracing::debug!(key = %entry.key, "Evicted entry to stay within capacity");
                self.index.remove(&entry.key);
                self.stats.record_eviction();
            }
        }
    }

    /// Removes an entry from the queue, the index and the arena.
    fn remove_entry(&mut self, id: EntryId) {
        self.queue.remove(&mut self.arena, id);
        if let Some(entry) = self.arena.remove(id) {
            self.index.remove(&entry.key);
        }
        self.stats.set_total_entries(self.index.len());
    }

    /// Panics if the index, the arena and the queue disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.index.len(), self.arena.len(), "index/arena size mismatch");
        assert_eq!(self.index.len(), self.queue.len(), "index/queue size mismatch");

        for (position, &id) in self.queue.items().iter().enumerate() {
            let entry = &self.arena[id];
            assert_eq!(entry.queue_index(), Some(position), "stale queue index for {}", entry.key);
            assert_eq!(self.index.get(&entry.key), Some(&id), "queued entry missing from index");
            if position > 0 {
                let parent = &self.arena[self.queue.items()[(position - 1) / 2]];
                assert!(
                    !crate::cache::queue::expires_before(entry.expire_at, parent.expire_at),
                    "heap order violated at {}",
                    position
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn expire_at(&self, key: &str) -> Option<Option<Instant>> {
        self.index.get(key).map(|&id| self.arena[id].expire_at)
    }
}

/// Rejects empty keys and keys longer than [`MAX_KEY_LENGTH`].
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
