//! Dictionary facade
//!
//! `ReplayDictionary` keeps three structures mutually consistent on top of
//! an index that supports point removal only by id and exposes no insertion
//! order:
//!
//! - the payload table (liveness source of truth)
//! - the FIFO eviction queue (insertion order, stale ids skipped lazily)
//! - the ANN index (exactly the live vectors)
//!
//! Capacity is enforced incrementally: each inserted item that pushes the
//! table over `maxlen` evicts exactly one oldest live entry. `update`
//! replaces entries without touching the queue, leaving stale queue ids
//! behind for the next eviction scan.
//!
//! All validation happens before any mutation; failures detected mid-way
//! (index desync) are surfaced immediately without rollback.

use tracing::debug;

use crate::alloc::IdAllocator;
use crate::backend::{AnnIndex, IndexBackendFactory};
use crate::payloads::PayloadStore;
use crate::queue::EvictionQueue;
use replay_core::{DictResult, DictionaryError, EntryId, KnnMatch, Payload};
use rustc_hash::FxHashSet;

/// Bounded-capacity cache of embeddings and payloads with k-NN lookup
pub struct ReplayDictionary {
    pub(crate) alloc: IdAllocator,
    pub(crate) payloads: PayloadStore,
    pub(crate) queue: EvictionQueue,
    pub(crate) index: Box<dyn AnnIndex>,
    pub(crate) maxlen: usize,
}

impl ReplayDictionary {
    /// Create a dictionary over an injected index backend
    ///
    /// `maxlen` is the fixed capacity, immutable for the instance lifetime.
    pub fn new(maxlen: usize, index: Box<dyn AnnIndex>) -> DictResult<Self> {
        if maxlen == 0 {
            return Err(DictionaryError::ZeroCapacity);
        }
        Ok(ReplayDictionary {
            alloc: IdAllocator::new(),
            payloads: PayloadStore::new(),
            queue: EvictionQueue::new(),
            index,
            maxlen,
        })
    }

    /// Create a dictionary over the default brute-force backend
    pub fn with_capacity(maxlen: usize) -> DictResult<Self> {
        Self::new(maxlen, IndexBackendFactory::default().create())
    }

    /// Insert a batch of entries, evicting the oldest live entries on overflow
    ///
    /// The first call ever builds the index; later calls extend it. Returns
    /// the assigned ids, in input order. After this returns, the live entry
    /// count is at most `maxlen`.
    pub fn add(&mut self, embeddings: &[Vec<f32>], payloads: Vec<Payload>) -> DictResult<Vec<EntryId>> {
        if embeddings.len() != payloads.len() {
            return Err(DictionaryError::LengthMismatch {
                embeddings: embeddings.len(),
                payloads: payloads.len(),
            });
        }
        if embeddings.is_empty() {
            return Ok(Vec::new());
        }
        check_nan(embeddings, "add")?;
        self.check_dimensions(embeddings)?;

        // The counter doubles as the "ever added" flag: zero means the
        // index was never built.
        if self.alloc.value() == 0 {
            self.index.build(embeddings)?;
        } else {
            self.index.add(embeddings)?;
        }

        let ids = self.alloc.next_batch(embeddings.len());
        for (id, payload) in ids.iter().zip(payloads) {
            self.payloads.put(*id, payload);
            self.queue.push_back(*id);

            if self.payloads.len() > self.maxlen {
                self.evict_one()?;
            }
        }

        debug!(
            target: "replay::dictionary",
            added = ids.len(),
            live = self.payloads.len(),
            queued = self.queue.len(),
            "Batch added"
        );
        Ok(ids)
    }

    /// Replace existing entries with new embeddings and payloads
    ///
    /// Semantically remove-then-add, but the removed ids are left in the
    /// eviction queue as stale entries to be skipped by a later `add`'s
    /// eviction scan. Returns the fresh ids, in input order.
    ///
    /// NOTE: this operation does not enforce the capacity bound by itself.
    /// Entry count can sit above `maxlen` until the next `add` reclaims the
    /// slack. Callers must not assume `len() <= capacity()` right after an
    /// `update`.
    pub fn update(
        &mut self,
        old_ids: &[EntryId],
        embeddings: &[Vec<f32>],
        payloads: Vec<Payload>,
    ) -> DictResult<Vec<EntryId>> {
        if embeddings.len() != payloads.len() {
            return Err(DictionaryError::LengthMismatch {
                embeddings: embeddings.len(),
                payloads: payloads.len(),
            });
        }
        if old_ids.len() != embeddings.len() {
            return Err(DictionaryError::IdCountMismatch {
                ids: old_ids.len(),
                embeddings: embeddings.len(),
            });
        }
        let unique: FxHashSet<EntryId> = old_ids.iter().copied().collect();
        if unique.len() != old_ids.len() {
            return Err(DictionaryError::DuplicateIds);
        }
        if old_ids.is_empty() {
            return Ok(Vec::new());
        }
        check_nan(embeddings, "update")?;
        self.check_dimensions(embeddings)?;
        for old_id in old_ids {
            if !self.payloads.contains(*old_id) {
                return Err(DictionaryError::StaleReference { id: *old_id });
            }
        }

        self.index.add(embeddings)?;
        let new_ids = self.alloc.next_batch(embeddings.len());

        for ((old_id, new_id), payload) in old_ids.iter().zip(&new_ids).zip(payloads) {
            self.payloads.put(*new_id, payload);
            self.queue.push_back(*new_id);

            self.index.remove(*old_id)?;
            self.payloads.remove(*old_id);
            // The old id stays in the queue; the eviction scan skips it.
        }

        debug!(
            target: "replay::dictionary",
            replaced = new_ids.len(),
            live = self.payloads.len(),
            queued = self.queue.len(),
            "Entries replaced"
        );
        Ok(new_ids)
    }

    /// k-nearest-neighbor lookup for a batch of query vectors
    ///
    /// Each row holds up to `k` matches ascending by distance, resolved to
    /// their stored payloads. Rows may be shorter than `k` when fewer live
    /// entries exist.
    pub fn query_knn(&self, queries: &[Vec<f32>], k: usize) -> DictResult<Vec<Vec<KnnMatch>>> {
        check_nan(queries, "query")?;
        if let Some(expected) = self.index.dimension() {
            for query in queries {
                if query.len() != expected {
                    return Err(DictionaryError::DimensionMismatch {
                        expected,
                        got: query.len(),
                    });
                }
            }
        }

        let rows = self.index.query(queries, k)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut matches = Vec::with_capacity(row.len());
            for (id, distance) in row {
                let payload = self
                    .payloads
                    .get(id)
                    .ok_or(DictionaryError::StaleReference { id })?;
                matches.push(KnnMatch {
                    id,
                    distance,
                    payload: payload.clone(),
                });
            }
            out.push(matches);
        }
        Ok(out)
    }

    /// k-nearest-neighbor lookup for a single query vector
    pub fn query_knn_one(&self, query: &[f32], k: usize) -> DictResult<Vec<KnnMatch>> {
        let batch = [query.to_vec()];
        let mut rows = self.query_knn(&batch, k)?;
        // One query in, exactly one row out.
        Ok(rows.pop().unwrap_or_default())
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Check if no entries are live
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Fixed capacity configured at construction
    pub fn capacity(&self) -> usize {
        self.maxlen
    }

    /// Check whether `id` is live
    pub fn contains(&self, id: EntryId) -> bool {
        self.payloads.contains(id)
    }

    /// Queue length including stale entries (observability)
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Live ids, unordered
    pub fn ids(&self) -> Vec<EntryId> {
        self.payloads.iter().map(|(id, _)| id).collect()
    }

    /// Evict the oldest live entry from all three structures
    ///
    /// Pops stale queue heads until a live id surfaces. An exhausted queue
    /// while the table is non-empty means the structures desynchronized.
    fn evict_one(&mut self) -> DictResult<()> {
        while let Some(candidate) = self.queue.pop_front() {
            if !self.payloads.contains(candidate) {
                // Stale: invalidated by a past update. Discard and keep scanning.
                continue;
            }

            self.index.remove(candidate)?;
            self.payloads.remove(candidate);
            debug!(
                target: "replay::dictionary",
                victim = %candidate,
                live = self.payloads.len(),
                "Evicted oldest entry"
            );
            return Ok(());
        }
        Err(DictionaryError::QueueExhausted)
    }

    /// Validate batch dimensions before any mutation
    ///
    /// Once the index is built its dimension is fixed; before that the
    /// first vector of the batch sets the expectation.
    fn check_dimensions(&self, embeddings: &[Vec<f32>]) -> DictResult<()> {
        let expected = match self.index.dimension() {
            Some(d) => d,
            None => match embeddings.first() {
                Some(first) => first.len(),
                None => return Ok(()),
            },
        };
        for embedding in embeddings {
            if embedding.len() != expected {
                return Err(DictionaryError::DimensionMismatch {
                    expected,
                    got: embedding.len(),
                });
            }
        }
        Ok(())
    }
}

fn check_nan(vectors: &[Vec<f32>], operation: &'static str) -> DictResult<()> {
    if vectors.iter().flatten().any(|v| v.is_nan()) {
        return Err(DictionaryError::NanInput { operation });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_core::PayloadValue;

    fn entry(x: f32, q: f32) -> (Vec<f32>, Payload) {
        let embedding = vec![x, 0.0];
        (embedding.clone(), Payload::new(embedding, q))
    }

    fn add_one(dict: &mut ReplayDictionary, x: f32, q: f32) -> EntryId {
        let (e, p) = entry(x, q);
        dict.add(&[e], vec![p]).unwrap()[0]
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            ReplayDictionary::with_capacity(0),
            Err(DictionaryError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let mut dict = ReplayDictionary::with_capacity(10).unwrap();
        let (e1, p1) = entry(1.0, 0.1);
        let (e2, p2) = entry(2.0, 0.2);
        let ids = dict.add(&[e1, e2], vec![p1, p2]).unwrap();
        assert_eq!(ids, vec![EntryId::new(0), EntryId::new(1)]);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_capacity_invariant_across_adds() {
        let mut dict = ReplayDictionary::with_capacity(3).unwrap();
        for i in 0..20 {
            add_one(&mut dict, i as f32, 0.0);
            assert!(dict.len() <= dict.capacity());
        }
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_fifo_eviction_order() {
        let mut dict = ReplayDictionary::with_capacity(2).unwrap();
        let a = add_one(&mut dict, 0.0, 0.0);
        let b = add_one(&mut dict, 1.0, 0.0);
        let c = add_one(&mut dict, 2.0, 0.0);

        assert!(!dict.contains(a));
        assert!(dict.contains(b));
        assert!(dict.contains(c));
        assert_eq!((a, b, c), (EntryId::new(0), EntryId::new(1), EntryId::new(2)));
    }

    #[test]
    fn test_batch_overflow_evicts_per_item() {
        let mut dict = ReplayDictionary::with_capacity(2).unwrap();
        let batch: Vec<(Vec<f32>, Payload)> = (0..4).map(|i| entry(i as f32, 0.0)).collect();
        let embeddings: Vec<Vec<f32>> = batch.iter().map(|(e, _)| e.clone()).collect();
        let payloads: Vec<Payload> = batch.iter().map(|(_, p)| p.clone()).collect();

        dict.add(&embeddings, payloads).unwrap();
        assert_eq!(dict.len(), 2);
        assert!(dict.contains(EntryId::new(2)));
        assert!(dict.contains(EntryId::new(3)));
    }

    #[test]
    fn test_nan_rejected_without_mutation() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        add_one(&mut dict, 1.0, 0.5);

        let err = dict
            .add(&[vec![f32::NAN, 0.0]], vec![Payload::new(vec![0.0, 0.0], 0.0)])
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.queue_len(), 1);
    }

    #[test]
    fn test_nan_rejected_in_query() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        add_one(&mut dict, 1.0, 0.5);
        let err = dict.query_knn_one(&[f32::NAN, 0.0], 1).unwrap_err();
        assert!(matches!(err, DictionaryError::NanInput { operation: "query" }));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        let err = dict.add(&[vec![1.0, 0.0]], vec![]).unwrap_err();
        assert!(matches!(
            err,
            DictionaryError::LengthMismatch {
                embeddings: 1,
                payloads: 0
            }
        ));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        add_one(&mut dict, 1.0, 0.0);
        let err = dict
            .add(&[vec![1.0, 2.0, 3.0]], vec![Payload::new(vec![1.0], 0.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            DictionaryError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        ));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_mixed_dimension_first_batch_rejected() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        let err = dict
            .add(
                &[vec![1.0, 0.0], vec![1.0]],
                vec![Payload::new(vec![1.0, 0.0], 0.0), Payload::new(vec![1.0], 0.0)],
            )
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(dict.is_empty());
    }

    #[test]
    fn test_query_returns_stored_payload() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        add_one(&mut dict, 1.0, 0.25);
        add_one(&mut dict, 5.0, 0.75);

        let matches = dict.query_knn_one(&[1.1, 0.0], 1).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, EntryId::new(0));
        assert_eq!(matches[0].payload.value, PayloadValue::Scalar(0.25));
        assert_eq!(matches[0].payload.embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn test_query_batch_rows_match_queries() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        add_one(&mut dict, 0.0, 0.1);
        add_one(&mut dict, 10.0, 0.2);

        let rows = dict
            .query_knn(&[vec![0.0, 0.0], vec![10.0, 0.0]], 1)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].id, EntryId::new(0));
        assert_eq!(rows[1][0].id, EntryId::new(1));
    }

    #[test]
    fn test_query_fewer_than_k() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        add_one(&mut dict, 1.0, 0.0);
        let matches = dict.query_knn_one(&[1.0, 0.0], 100).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_query_before_any_add_fails() {
        let dict = ReplayDictionary::with_capacity(4).unwrap();
        assert!(dict.query_knn_one(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_update_removes_old_entry() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        let a = add_one(&mut dict, 1.0, 0.5);

        let (e2, p2) = entry(9.0, 0.9);
        let new_ids = dict.update(&[a], &[e2], vec![p2]).unwrap();
        let b = new_ids[0];

        assert!(!dict.contains(a));
        assert!(dict.contains(b));
        assert_eq!(dict.len(), 1);

        let matches = dict.query_knn_one(&[1.0, 0.0], 4).unwrap();
        assert!(matches.iter().all(|m| m.id != a));
        assert!(matches.iter().any(|m| m.id == b));
    }

    #[test]
    fn test_update_duplicate_ids_rejected() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        let a = add_one(&mut dict, 1.0, 0.0);
        let (e, p) = entry(2.0, 0.0);
        let (e2, p2) = entry(3.0, 0.0);
        let err = dict.update(&[a, a], &[e, e2], vec![p, p2]).unwrap_err();
        assert!(matches!(err, DictionaryError::DuplicateIds));
    }

    #[test]
    fn test_update_dead_id_rejected() {
        let mut dict = ReplayDictionary::with_capacity(4).unwrap();
        let a = add_one(&mut dict, 1.0, 0.0);
        let (e, p) = entry(2.0, 0.0);
        dict.update(&[a], &[e], vec![p]).unwrap();

        // `a` is gone now.
        let (e2, p2) = entry(3.0, 0.0);
        let err = dict.update(&[a], &[e2], vec![p2]).unwrap_err();
        assert!(matches!(err, DictionaryError::StaleReference { id } if id == a));
    }

    #[test]
    fn test_repeated_update_accumulates_stale_queue_entries() {
        let mut dict = ReplayDictionary::with_capacity(2).unwrap();
        let mut id = add_one(&mut dict, 1.0, 0.0);

        for i in 0..10 {
            let (e, p) = entry(i as f32, 0.0);
            id = dict.update(&[id], &[e], vec![p]).unwrap()[0];
        }

        assert_eq!(dict.len(), 1);
        // One live id at the tail, ten stale ones ahead of it.
        assert_eq!(dict.queue_len(), 11);
    }

    #[test]
    fn test_eviction_skips_stale_entries() {
        let mut dict = ReplayDictionary::with_capacity(2).unwrap();
        let a = add_one(&mut dict, 1.0, 0.0);
        let b = add_one(&mut dict, 2.0, 0.0);

        // Replace `a`; its queue slot goes stale, fresh id at the tail.
        let (e, p) = entry(3.0, 0.0);
        let c = dict.update(&[a], &[e], vec![p]).unwrap()[0];

        // Overflow: the scan must skip stale `a` and evict `b`, the oldest
        // still-live entry.
        let d = add_one(&mut dict, 4.0, 0.0);

        assert!(!dict.contains(a));
        assert!(!dict.contains(b));
        assert!(dict.contains(c));
        assert!(dict.contains(d));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_update_does_not_enforce_capacity() {
        // Documented quirk: update never evicts, so replacing entries while
        // at capacity keeps the count steady, and the table only shrinks
        // back on the next add.
        let mut dict = ReplayDictionary::with_capacity(2).unwrap();
        let a = add_one(&mut dict, 1.0, 0.0);
        let _b = add_one(&mut dict, 2.0, 0.0);

        let (e, p) = entry(3.0, 0.0);
        dict.update(&[a], &[e], vec![p]).unwrap();
        assert_eq!(dict.len(), 2);

        add_one(&mut dict, 4.0, 0.0);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_query_liveness_after_heavy_churn() {
        let mut dict = ReplayDictionary::with_capacity(3).unwrap();
        let mut last = add_one(&mut dict, 0.0, 0.0);
        for i in 1..30 {
            if i % 3 == 0 {
                let (e, p) = entry(i as f32, i as f32);
                last = dict.update(&[last], &[e], vec![p]).unwrap()[0];
            } else {
                last = add_one(&mut dict, i as f32, i as f32);
            }
        }

        let rows = dict.query_knn(&[vec![15.0, 0.0]], 10).unwrap();
        for m in &rows[0] {
            assert!(dict.contains(m.id));
        }
        assert_eq!(rows[0].len(), dict.len());
    }

    #[test]
    fn test_empty_add_is_noop() {
        let mut dict = ReplayDictionary::with_capacity(2).unwrap();
        assert!(dict.add(&[], vec![]).unwrap().is_empty());
        assert!(dict.is_empty());
    }
}
