//! Expiry Queue Module
//!
//! Binary min-heap of entry handles ordered by absolute expiration time.
//!
//! The heap stores [`EntryId`]s and keeps each entry's `queue_index` equal to
//! its current array position. Every swap, push and pop writes the new
//! position back into the arena, which is what makes `fix` and `remove`
//! logarithmic.

use std::time::Instant;

use crate::cache::entry::{EntryArena, EntryId};

/// Returns true if expiry `a` sorts strictly before expiry `b`.
///
/// None is the infinite sentinel and sorts after every finite expiry.
pub fn expires_before(a: Option<Instant>, b: Option<Instant>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a < b,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

// == Expiry Queue ==
/// Min-heap of entries keyed by `expire_at`.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    items: Vec<EntryId>,
}

impl ExpiryQueue {
    // == Constructor ==
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    // == Push ==
    /// Enqueues an entry.
    pub fn push<V>(&mut self, arena: &mut EntryArena<V>, id: EntryId) {
        let index = self.items.len();
        arena[id].queue_index = Some(index);
        self.items.push(id);
        self.sift_up(arena, index);
    }

    // == Pop Min ==
    /// Removes and returns the entry expiring soonest.
    ///
    /// Returns None if the queue is empty.
    pub fn pop_min<V>(&mut self, arena: &mut EntryArena<V>) -> Option<EntryId> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.swap(arena, 0, last);
        let id = self.items.pop()?;
        arena[id].queue_index = None;
        if !self.items.is_empty() {
            self.sift_down(arena, 0);
        }
        Some(id)
    }

    // == Peek Min ==
    /// Returns the entry expiring soonest without removing it.
    pub fn peek_min(&self) -> Option<EntryId> {
        self.items.first().copied()
    }

    // == Fix ==
    /// Restores heap order after the entry's `expire_at` changed.
    pub fn fix<V>(&mut self, arena: &mut EntryArena<V>, id: EntryId) {
        if let Some(index) = self.position(arena, id) {
            if !self.sift_down(arena, index) {
                self.sift_up(arena, index);
            }
        }
    }

    // == Remove ==
    /// Removes an arbitrary entry by its queue position.
    ///
    /// Returns false if the entry is not enqueued.
    pub fn remove<V>(&mut self, arena: &mut EntryArena<V>, id: EntryId) -> bool {
        let Some(index) = self.position(arena, id) else {
            return false;
        };
        let last = self.items.len() - 1;
        if index != last {
            self.swap(arena, index, last);
        }
        self.items.pop();
        arena[id].queue_index = None;
        if index < self.items.len() && !self.sift_down(arena, index) {
            self.sift_up(arena, index);
        }
        true
    }

    // == Length ==
    /// Returns the number of enqueued entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Enqueued entries in heap array order.
    pub fn items(&self) -> &[EntryId] {
        &self.items
    }

    /// Verified position of `id`, None if the entry is not in this queue.
    fn position<V>(&self, arena: &EntryArena<V>, id: EntryId) -> Option<usize> {
        let index = arena.get(id)?.queue_index?;
        (self.items.get(index) == Some(&id)).then_some(index)
    }

    fn less<V>(&self, arena: &EntryArena<V>, i: usize, j: usize) -> bool {
        expires_before(arena[self.items[i]].expire_at, arena[self.items[j]].expire_at)
    }

    fn swap<V>(&mut self, arena: &mut EntryArena<V>, i: usize, j: usize) {
        self.items.swap(i, j);
        arena[self.items[i]].queue_index = Some(i);
        arena[self.items[j]].queue_index = Some(j);
    }

    fn sift_up<V>(&mut self, arena: &mut EntryArena<V>, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(arena, index, parent) {
                break;
            }
            self.swap(arena, index, parent);
            index = parent;
        }
    }

    /// Returns true if the element moved.
    fn sift_down<V>(&mut self, arena: &mut EntryArena<V>, start: usize) -> bool {
        let len = self.items.len();
        let mut index = start;
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(arena, right, left) {
                right
            } else {
                left
            };
            if !self.less(arena, child, index) {
                break;
            }
            self.swap(arena, index, child);
            index = child;
        }
        index > start
    }
}
