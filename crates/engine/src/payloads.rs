//! Payload table
//!
//! Maps entry ids to their stored payloads. Presence in this table is the
//! sole source of truth for "this entry is live": the eviction queue may
//! hold stale ids and the index is kept in sync against this table.

use replay_core::{EntryId, Payload};
use rustc_hash::FxHashMap;

/// Id -> payload table with O(1) amortized operations
#[derive(Debug, Default)]
pub struct PayloadStore {
    entries: FxHashMap<EntryId, Payload>,
}

impl PayloadStore {
    /// Create an empty store
    pub fn new() -> Self {
        PayloadStore {
            entries: FxHashMap::default(),
        }
    }

    /// Insert or replace the payload for `id`
    pub fn put(&mut self, id: EntryId, payload: Payload) {
        self.entries.insert(id, payload);
    }

    /// Get the payload for `id`, if live
    pub fn get(&self, id: EntryId) -> Option<&Payload> {
        self.entries.get(&id)
    }

    /// Remove and return the payload for `id`, if live
    pub fn remove(&mut self, id: EntryId) -> Option<Payload> {
        self.entries.remove(&id)
    }

    /// Check whether `id` is live
    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries are live
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over live entries (no ordering guarantee)
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Payload)> {
        self.entries.iter().map(|(id, p)| (*id, p))
    }

    /// Live ids sorted ascending
    ///
    /// Used by the snapshot codec for deterministic output; the map itself
    /// has no iteration order.
    pub fn sorted_ids(&self) -> Vec<EntryId> {
        let mut ids: Vec<EntryId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
