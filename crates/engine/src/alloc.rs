//! Monotonic identifier allocation
//!
//! Every entry ever inserted gets a fresh id from a single counter that is
//! never decremented during normal operation. The counter is reset only by
//! snapshot restore, which renumbers every surviving entry through a remap
//! table, so ids from before and after a restore can never collide.

use replay_core::EntryId;

/// Allocator for monotonically increasing entry identifiers
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create an allocator starting at id 0
    pub fn new() -> Self {
        IdAllocator { next: 0 }
    }

    /// Allocate one fresh id
    pub fn next_id(&mut self) -> EntryId {
        let id = EntryId::new(self.next);
        self.next += 1;
        id
    }

    /// Allocate `n` fresh ids, in ascending order
    ///
    /// Each id is strictly greater than every previously issued value.
    pub fn next_batch(&mut self, n: usize) -> Vec<EntryId> {
        let start = self.next;
        self.next += n as u64;
        (start..self.next).map(EntryId::new).collect()
    }

    /// Current counter value (the next id that would be issued)
    pub fn value(&self) -> u64 {
        self.next
    }

    /// Reset the counter to zero
    ///
    /// Only valid as part of a full state replacement (snapshot restore);
    /// resetting a live allocator would reissue ids.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}
