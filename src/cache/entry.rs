//! Cache Entry Module
//!
//! Defines cache entries with an absolute expiry and the arena that owns them.
//! The index and the expiry queue refer to entries by [`EntryId`], so moving an
//! entry inside the heap never invalidates a reference held elsewhere.

use std::ops::{Index, IndexMut};
use std::time::{Duration, Instant};

// == Entry Id ==
/// Stable handle to an entry slot in an [`EntryArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

// == Cache Entry ==
/// Represents a single cache entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The key this entry is indexed under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Explicit TTL from the last set, None = follow the cache default
    pub ttl: Option<Duration>,
    /// Absolute expiration time, None = never expires
    pub expire_at: Option<Instant>,
    /// Position in the expiry queue, written only by the queue
    pub(crate) queue_index: Option<usize>,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates a new entry that is not yet enqueued.
    ///
    /// # Arguments
    /// * `key` - The key the entry is stored under
    /// * `value` - The value to store
    /// * `ttl` - Explicit TTL, None when the default applies
    /// * `expire_at` - Resolved expiration time
    pub fn new(key: String, value: V, ttl: Option<Duration>, expire_at: Option<Instant>) -> Self {
        Self {
            key,
            value,
            ttl,
            expire_at,
            queue_index: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches its
    /// expiration time. Entries without an expiration never expire.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expire_at {
            Some(expire_at) => now >= expire_at,
            None => false,
        }
    }

    /// Remaining time to live as of `now`, or None if the entry never expires.
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expire_at
            .map(|expire_at| expire_at.saturating_duration_since(now))
    }

    /// Current position in the expiry queue.
    pub fn queue_index(&self) -> Option<usize> {
        self.queue_index
    }
}

/// Resolves an absolute expiration time, None when `ttl` is None or overflows.
pub fn expiry_from(now: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.and_then(|ttl| now.checked_add(ttl))
}

// == Entry Arena ==
/// Slot storage for entries with a free list for slot reuse.
#[derive(Debug)]
pub struct EntryArena<V> {
    slots: Vec<Option<Entry<V>>>,
    free: Vec<usize>,
    len: usize,
}

impl<V> EntryArena<V> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Stores an entry and returns its handle.
    pub fn insert(&mut self, entry: Entry<V>) -> EntryId {
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                EntryId(slot)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId(self.slots.len() - 1)
            }
        }
    }

    /// Removes an entry, returning it if the handle was live.
    pub fn remove(&mut self, id: EntryId) -> Option<Entry<V>> {
        let entry = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(entry)
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry<V>> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry<V>> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over live entries with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Entry<V>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|entry| (EntryId(slot), entry)))
    }
}

impl<V> Default for EntryArena<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Index<EntryId> for EntryArena<V> {
    type Output = Entry<V>;

    fn index(&self, id: EntryId) -> &Entry<V> {
        self.get(id).expect("dangling entry id")
    }
}

impl<V> IndexMut<EntryId> for EntryArena<V> {
    fn index_mut(&mut self, id: EntryId) -> &mut Entry<V> {
        self.get_mut(id).expect("dangling entry id")
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = Entry::new("key".to_string(), "test_value", None, None);

        assert_eq!(entry.value, "test_value");
        assert!(entry.expire_at.is_none());
        assert!(entry.queue_index().is_none());
        assert!(!entry.is_expired_at(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn test_entry_expiration_boundary() {
        let now = Instant::now();
        let ttl = Duration::from_secs(1);
        let entry = Entry::new("key".to_string(), 1, Some(ttl), expiry_from(now, Some(ttl)));

        assert!(!entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now + Duration::from_millis(999)));
        assert!(entry.is_expired_at(now + ttl), "Entry should be expired at boundary");
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Instant::now();
        let entry = Entry::new("key".to_string(), 1, None, expiry_from(now, Some(Duration::from_secs(10))));

        assert_eq!(
            entry.ttl_remaining_at(now + Duration::from_secs(4)),
            Some(Duration::from_secs(6))
        );
        assert_eq!(
            entry.ttl_remaining_at(now + Duration::from_secs(20)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_expiry_from_overflow_is_never() {
        assert!(expiry_from(Instant::now(), Some(Duration::MAX)).is_none());
        assert!(expiry_from(Instant::now(), None).is_none());
    }

    #[test]
    fn test_arena_reuses_freed_slots() {
        let mut arena = EntryArena::new();
        let a = arena.insert(Entry::new("a".to_string(), 1, None, None));
        let b = arena.insert(Entry::new("b".to_string(), 2, None, None));
        assert_eq!(arena.len(), 2);

        let removed = arena.remove(a).unwrap();
        assert_eq!(removed.key, "a");
        assert!(arena.get(a).is_none());
        assert!(arena.remove(a).is_none());

        let c = arena.insert(Entry::new("c".to_string(), 3, None, None));
        assert_eq!(c, a);
        assert_eq!(arena[b].value, 2);
        assert_eq!(arena[c].value, 3);
        assert_eq!(arena.iter().count(), 2);
    }
}
