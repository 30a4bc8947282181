//! FIFO eviction queue
//!
//! Records insertion order for eviction. The queue is append-at-tail,
//! pop-from-head and deliberately knows nothing about liveness: when an
//! entry is replaced via `update`, its old id stays behind as a stale
//! queue entry and is skipped lazily by the facade's eviction scan. True
//! removal-by-value from the middle of the queue is never attempted.

use replay_core::EntryId;
use std::collections::VecDeque;

/// Insertion-order queue of entry ids, possibly containing stale ids
#[derive(Debug, Default)]
pub struct EvictionQueue {
    order: VecDeque<EntryId>,
}

impl EvictionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        EvictionQueue {
            order: VecDeque::new(),
        }
    }

    /// Append an id at the tail
    pub fn push_back(&mut self, id: EntryId) {
        self.order.push_back(id);
    }

    /// Look at the head without removing it
    pub fn peek_front(&self) -> Option<EntryId> {
        self.order.front().copied()
    }

    /// Remove and return the head
    pub fn pop_front(&mut self) -> Option<EntryId> {
        self.order.pop_front()
    }

    /// Total queue length, stale entries included
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate head-to-tail, stale entries included
    pub fn iter(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.order.iter().copied()
    }

    /// Drop all queued ids
    pub fn clear(&mut self) {
        self.order.clear();
    }
}
