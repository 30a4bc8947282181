//! Error types for the replay dictionary

use crate::types::EntryId;
use thiserror::Error;

/// Errors raised by an index backend
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index has not been built yet
    #[error("Index not built: call build before add or query")]
    NotBuilt,

    /// No vector is associated with the given id
    #[error("Vector not found in index: {id}")]
    NotFound {
        /// The id that was never added or already removed
        id: EntryId,
    },

    /// Vector dimension doesn't match the built index
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension fixed by the first build
        expected: usize,
        /// Actual dimension of the offending vector
        got: usize,
    },

    /// Build was called with no vectors
    #[error("Cannot build index from an empty vector set")]
    EmptyBuild,
}

/// Result type alias for index backend operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised by the dictionary facade
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// NaN detected in an input embedding
    #[error("NaN detected in input embeddings during {operation}")]
    NanInput {
        /// The operation that rejected the input ("add", "update", "query")
        operation: &'static str,
    },

    /// Embeddings and payloads have different lengths
    #[error("Length mismatch: {embeddings} embeddings, {payloads} payloads")]
    LengthMismatch {
        /// Number of embeddings passed
        embeddings: usize,
        /// Number of payloads passed
        payloads: usize,
    },

    /// Duplicate ids passed to update
    #[error("Duplicate ids passed to update")]
    DuplicateIds,

    /// Old-id count doesn't match the replacement count in update
    #[error("Id count mismatch: {ids} ids for {embeddings} embeddings")]
    IdCountMismatch {
        /// Number of old ids passed
        ids: usize,
        /// Number of replacement embeddings passed
        embeddings: usize,
    },

    /// Input vector dimension doesn't match the dictionary's index
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension fixed by the first add
        expected: usize,
        /// Actual dimension of the offending vector
        got: usize,
    },

    /// Capacity must be at least one entry
    #[error("Capacity must be greater than zero")]
    ZeroCapacity,

    /// Restored snapshot capacity differs from the configured capacity
    #[error("Capacity mismatch: instance configured for {expected}, snapshot has {got}")]
    ConfigMismatch {
        /// Capacity this instance was constructed with
        expected: usize,
        /// Capacity recorded in the snapshot
        got: usize,
    },

    /// An index-returned id has no payload table entry
    ///
    /// Indicates the index and the payload table have desynchronized.
    /// Unrecoverable for this instance; no repair is attempted.
    #[error("Stale reference: index returned {id} with no stored payload")]
    StaleReference {
        /// The orphaned id
        id: EntryId,
    },

    /// The eviction queue ran dry while the payload table is over capacity
    ///
    /// Every live id is pushed exactly once, so an exhausted queue with a
    /// non-empty table means the structures have desynchronized.
    #[error("Eviction queue exhausted while over capacity")]
    QueueExhausted,

    /// Index backend error
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// IO error (snapshot operations)
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot is corrupt or has an unsupported version
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl DictionaryError {
    /// Check if this error is an input-validation rejection
    ///
    /// Validation errors are raised before any mutation; the instance is
    /// untouched and remains usable.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            DictionaryError::NanInput { .. }
                | DictionaryError::LengthMismatch { .. }
                | DictionaryError::DuplicateIds
                | DictionaryError::IdCountMismatch { .. }
                | DictionaryError::DimensionMismatch { .. }
                | DictionaryError::ZeroCapacity
        )
    }

    /// Check if this error indicates the internal structures desynchronized
    ///
    /// Invariant breaches are fatal to the instance, not retryable.
    pub fn is_invariant_breach(&self) -> bool {
        matches!(
            self,
            DictionaryError::StaleReference { .. } | DictionaryError::QueueExhausted
        )
    }
}

impl From<std::io::Error> for DictionaryError {
    fn from(e: std::io::Error) -> Self {
        DictionaryError::Io(e.to_string())
    }
}

/// Result type alias for dictionary operations
pub type DictResult<T> = Result<T, DictionaryError>;
