//! Core types for replaydb
//!
//! This crate defines the types shared by the engine and any caller:
//! - `EntryId`: stable logical identifier for a cached entry
//! - `Payload` / `PayloadValue`: the (embedding, metadata) pair stored per entry
//! - `KnnMatch`: a single nearest-neighbor search result
//! - `DictionaryError` / `IndexError`: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{DictResult, DictionaryError, IndexError, IndexResult};
pub use types::{EntryId, KnnMatch, Payload, PayloadValue};
