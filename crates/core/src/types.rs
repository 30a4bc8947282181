//! Shared data types for the replay dictionary

use serde::{Deserialize, Serialize};

/// Logical identifier for a cached entry
///
/// IMPORTANT: EntryIds are never reused while an instance is live.
/// They are allocated from a monotonically increasing counter and only
/// renumbered as a whole during snapshot restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl EntryId {
    /// Create a new EntryId
    pub fn new(id: u64) -> Self {
        EntryId(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

/// Auxiliary value stored next to an embedding
///
/// The original use case keeps a scalar return estimate per entry, but
/// callers may attach a small vector instead (e.g. per-action values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayloadValue {
    /// Single scalar metadata value
    Scalar(f32),
    /// Vector-valued metadata
    Vector(Vec<f32>),
}

impl PayloadValue {
    /// Get the scalar value, if this is a scalar payload
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            PayloadValue::Scalar(v) => Some(*v),
            PayloadValue::Vector(_) => None,
        }
    }

    /// Get the vector value, if this is a vector payload
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            PayloadValue::Scalar(_) => None,
            PayloadValue::Vector(v) => Some(v),
        }
    }
}

impl From<f32> for PayloadValue {
    fn from(v: f32) -> Self {
        PayloadValue::Scalar(v)
    }
}

impl From<Vec<f32>> for PayloadValue {
    fn from(v: Vec<f32>) -> Self {
        PayloadValue::Vector(v)
    }
}

/// The stored unit of the cache: an embedding copy plus its metadata
///
/// The embedding here is what queries return. It is typically identical
/// to the vector handed to the index, but the dictionary never assumes so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Embedding copy returned on query
    pub embedding: Vec<f32>,

    /// Scalar or vector metadata
    pub value: PayloadValue,
}

impl Payload {
    /// Create a payload from an embedding and metadata value
    pub fn new(embedding: Vec<f32>, value: impl Into<PayloadValue>) -> Self {
        Payload {
            embedding,
            value: value.into(),
        }
    }
}

/// A single k-NN search result
///
/// Matches are returned per query in ascending distance order. The payload
/// is the stored copy, resolved through the payload table at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnMatch {
    /// Identifier of the matched entry (live at query time)
    pub id: EntryId,

    /// Distance reported by the index backend (lower = closer)
    pub distance: f32,

    /// Stored payload for the matched entry
    pub payload: Payload,
}
