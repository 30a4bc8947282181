//! Engine for replaydb
//!
//! This crate implements the bounded vector memory:
//! - `IdAllocator`: monotonic identifier allocation
//! - `PayloadStore`: id -> payload table, the source of truth for liveness
//! - `EvictionQueue`: FIFO insertion-order queue with lazily skipped stale ids
//! - `AnnIndex` / `BruteForceIndex`: the index capability and its
//!   deterministic in-memory implementation
//! - `ReplayDictionary`: the facade tying the four together
//! - snapshot codec: versioned save/restore with id remapping
//!
//! The engine is single-threaded by design: every operation takes `&mut self`
//! and runs to completion. Wrap the dictionary in external mutual exclusion
//! if it must be shared.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alloc;
pub mod backend;
pub mod brute_force;
pub mod dictionary;
pub mod payloads;
pub mod queue;
pub mod snapshot;

pub use alloc::IdAllocator;
pub use backend::{AnnIndex, IndexBackendFactory};
pub use brute_force::{BruteForceIndex, DistanceMetric};
pub use dictionary::ReplayDictionary;
pub use payloads::PayloadStore;
pub use queue::EvictionQueue;
pub use snapshot::{snapshot_path, SNAPSHOT_VERSION};

pub use replay_core::{DictResult, DictionaryError, EntryId, IndexError, IndexResult};
pub use replay_core::{KnnMatch, Payload, PayloadValue};
