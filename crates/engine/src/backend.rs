//! ANN index backend trait
//!
//! The dictionary consumes the index strictly as a capability: build,
//! incremental add, point removal by id, and k-NN query. It never inspects
//! index internals; it only correlates returned ids with the payload table.
//! This keeps the core testable against the deterministic brute-force
//! implementation while allowing a real approximate index behind the same
//! trait.
//!
//! Id contract: vectors passed to `build` and `add` are assigned ids
//! 1:1, in order, from an internal counter that starts at zero and is reset
//! only by `build`. The dictionary allocates its own ids from an identical
//! counter advanced in lockstep, so the two id spaces always agree. Both
//! counters are reset together during snapshot restore.

use crate::brute_force::{BruteForceIndex, DistanceMetric};
use replay_core::{EntryId, IndexResult};

/// Capability interface for a vector index addressed by entry id
pub trait AnnIndex {
    /// Initialize the index from scratch over `vectors`
    ///
    /// Resets the id counter to zero and fixes the index dimension from the
    /// first vector. Must be called before `add` or `query` on an empty
    /// index; calling it again discards all previous content.
    fn build(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()>;

    /// Incrementally ingest `vectors` into an already-built index
    ///
    /// Ids continue from the counter where `build` / the previous `add`
    /// left off.
    fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()>;

    /// Remove the vector previously associated with `id`
    ///
    /// Fails with `IndexError::NotFound` if `id` was never added or was
    /// already removed.
    fn remove(&mut self, id: EntryId) -> IndexResult<()>;

    /// Discard all content and return to the unbuilt state
    ///
    /// After this call the index holds no vectors, has no dimension, and
    /// the next `build` restarts the id space from zero. Restore uses this
    /// so a snapshot with no entries still replaces the index content.
    fn clear(&mut self);

    /// For each query vector, up to `k` nearest (id, distance) pairs
    ///
    /// Rows are ascending by distance. A row may hold fewer than `k` pairs
    /// when fewer live vectors exist; callers must tolerate both paddings.
    fn query(&self, queries: &[Vec<f32>], k: usize) -> IndexResult<Vec<Vec<(EntryId, f32)>>>;

    /// Number of live vectors in the index
    fn len(&self) -> usize;

    /// Check if the index holds no live vectors
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension fixed by the first build, if built
    fn dimension(&self) -> Option<usize>;
}

/// Factory for constructing boxed index backends
#[derive(Debug, Clone, Default)]
pub enum IndexBackendFactory {
    /// Deterministic O(n) linear scan
    #[default]
    BruteForce,
    /// Linear scan with an explicit distance metric
    BruteForceWithMetric(DistanceMetric),
}

impl IndexBackendFactory {
    /// Create a new backend instance
    pub fn create(&self) -> Box<dyn AnnIndex> {
        match self {
            IndexBackendFactory::BruteForce => Box::new(BruteForceIndex::new()),
            IndexBackendFactory::BruteForceWithMetric(metric) => {
                Box::new(BruteForceIndex::with_metric(*metric))
            }
        }
    }
}
