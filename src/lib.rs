//! replaydb - bounded vector memory with approximate-nearest-neighbor lookup
//!
//! A fixed-capacity cache of embedding vectors paired with auxiliary
//! payloads. Entries are evicted oldest-first once the capacity is
//! exceeded, replaced in place via `update`, queried by similarity, and
//! persisted through versioned snapshots that renumber ids on restore.
//!
//! # Quick start
//!
//! ```
//! use replaydb::{Payload, ReplayDictionary};
//!
//! let mut memory = ReplayDictionary::with_capacity(1000)?;
//!
//! let embedding = vec![0.1, 0.9, 0.0];
//! let ids = memory.add(&[embedding.clone()], vec![Payload::new(embedding, 0.5)])?;
//!
//! let matches = memory.query_knn_one(&[0.1, 0.8, 0.1], 10)?;
//! assert_eq!(matches[0].id, ids[0]);
//! # Ok::<(), replaydb::DictionaryError>(())
//! ```
//!
//! # Architecture
//!
//! The index is consumed strictly as a capability ([`AnnIndex`]); the
//! dictionary only correlates index-returned ids with its payload table.
//! [`BruteForceIndex`] is the deterministic default backend; a real
//! approximate index plugs in behind the same trait.

// Re-export the public API from the engine crate
pub use replay_engine::*;
