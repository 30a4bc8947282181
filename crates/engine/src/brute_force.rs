//! Brute-force index backend
//!
//! Deterministic O(n) linear scan over all live vectors. Sufficient for the
//! window sizes this cache targets and for testing the dictionary logic
//! without a real approximate index behind it.
//!
//! Memory note: the positional id contract pins each vector to the slot
//! matching its id, so removal leaves a `None` tombstone and the slot
//! vector grows by one entry per insert for as long as the instance lives.
//! Only `build` (or `clear`) resets it. A long-running sliding window
//! therefore accumulates one tombstone per evicted entry between rebuilds;
//! restore-from-snapshot rebuilds and compacts the slots as a side effect.

use std::cmp::Ordering;

use crate::backend::AnnIndex;
use replay_core::{EntryId, IndexError, IndexResult};

/// Distance metric used by the brute-force scan
///
/// Both metrics order candidates identically; squared Euclidean skips the
/// square root when callers only care about ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// L2 distance
    #[default]
    Euclidean,
    /// L2 distance without the final square root
    SquaredEuclidean,
}

/// Brute-force vector index
///
/// Slot `i` holds the vector assigned id `i`; removal leaves `None` behind
/// so later ids keep their positions. `build` discards all slots and resets
/// the id space.
pub struct BruteForceIndex {
    /// Slot per ever-assigned id; None = removed
    slots: Vec<Option<Vec<f32>>>,

    /// Dimension fixed by the first build
    dimension: Option<usize>,

    /// Number of live (Some) slots
    live: usize,

    metric: DistanceMetric,
}

impl BruteForceIndex {
    /// Create an unbuilt index with the default metric
    pub fn new() -> Self {
        Self::with_metric(DistanceMetric::default())
    }

    /// Create an unbuilt index with an explicit metric
    pub fn with_metric(metric: DistanceMetric) -> Self {
        BruteForceIndex {
            slots: Vec::new(),
            dimension: None,
            live: 0,
            metric,
        }
    }

    /// The configured distance metric
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn check_dimension(&self, vector: &[f32]) -> IndexResult<()> {
        match self.dimension {
            Some(expected) if vector.len() != expected => Err(IndexError::DimensionMismatch {
                expected,
                got: vector.len(),
            }),
            Some(_) => Ok(()),
            None => Err(IndexError::NotBuilt),
        }
    }

    fn ingest(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        for vector in vectors {
            self.check_dimension(vector)?;
        }
        for vector in vectors {
            self.slots.push(Some(vector.clone()));
            self.live += 1;
        }
        Ok(())
    }
}

impl Default for BruteForceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnIndex for BruteForceIndex {
    fn build(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        let first = vectors.first().ok_or(IndexError::EmptyBuild)?;

        self.slots.clear();
        self.live = 0;
        self.dimension = Some(first.len());
        self.ingest(vectors)
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        if self.dimension.is_none() {
            return Err(IndexError::NotBuilt);
        }
        self.ingest(vectors)
    }

    fn remove(&mut self, id: EntryId) -> IndexResult<()> {
        let slot = self
            .slots
            .get_mut(id.as_u64() as usize)
            .ok_or(IndexError::NotFound { id })?;
        if slot.take().is_none() {
            return Err(IndexError::NotFound { id });
        }
        self.live -= 1;
        Ok(())
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
        self.dimension = None;
    }

    fn query(&self, queries: &[Vec<f32>], k: usize) -> IndexResult<Vec<Vec<(EntryId, f32)>>> {
        if self.dimension.is_none() {
            return Err(IndexError::NotBuilt);
        }
        for query in queries {
            self.check_dimension(query)?;
        }

        let mut rows = Vec::with_capacity(queries.len());
        for query in queries {
            let mut candidates: Vec<(EntryId, f32)> = self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(pos, slot)| {
                    slot.as_ref().map(|vector| {
                        (EntryId::new(pos as u64), distance(query, vector, self.metric))
                    })
                })
                .collect();

            // Ascending distance, id-ascending tie-break for determinism.
            candidates.sort_by(|(id_a, dist_a), (id_b, dist_b)| {
                dist_a
                    .partial_cmp(dist_b)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| id_a.cmp(id_b))
            });
            candidates.truncate(k);
            rows.push(candidates);
        }
        Ok(rows)
    }

    fn len(&self) -> usize {
        self.live
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

fn distance(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in distance");
    let squared: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    match metric {
        DistanceMetric::Euclidean => squared.sqrt(),
        DistanceMetric::SquaredEuclidean => squared,
    }
}
