//! Snapshot persistence
//!
//! Serializes the payload table, the eviction queue (stale ids included),
//! and the configured capacity. Restore performs a full state replacement
//! with id renumbering: every surviving entry gets a fresh id from a reset
//! allocator, the index is rebuilt from scratch over the stored embeddings
//! in the same order, and the queue is replayed through the old-to-new
//! remap. Ids that were already stale at save time have no mapping and are
//! dropped during replay.
//!
//! ## Snapshot format (version 0x01)
//!
//! ```text
//! [Version: u8]
//! [Header length: u32 LE]
//! [Header: MessagePack SnapshotHeader { maxlen, entries, queue }]
//! For each entry (ascending id):
//!   [EntryId: u64 LE]
//!   [Dimension: u32 LE]
//!   [Embedding: dimension * f32 LE]
//!   [Value length: u32 LE]
//!   [Value: MessagePack PayloadValue]
//! [Queue ids: queue * u64 LE, head to tail]
//! ```
//!
//! Entries are written in ascending-id order so identical logical state
//! produces byte-identical snapshots.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::dictionary::ReplayDictionary;
use replay_core::{DictResult, DictionaryError, EntryId, Payload, PayloadValue};
use rustc_hash::FxHashMap;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u8 = 0x01;

/// Snapshot header (MessagePack serialized)
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    /// Configured capacity; must match the restoring instance
    maxlen: u64,
    /// Number of live entries that follow
    entries: u64,
    /// Queue length, stale ids included
    queue: u64,
}

/// Compute the on-disk path for a named snapshot
///
/// `name` alone, or `name-<iteration>` when an iteration counter is given.
/// The suffix is caller convention only; the codec never interprets it.
pub fn snapshot_path(dir: &Path, name: &str, iteration: Option<u64>) -> PathBuf {
    match iteration {
        Some(it) => dir.join(format!("{name}-{it}")),
        None => dir.join(name),
    }
}

impl ReplayDictionary {
    /// Serialize the dictionary state to `writer`
    ///
    /// Pure side effect; in-memory state is untouched.
    pub fn snapshot_write<W: Write>(&self, writer: &mut W) -> DictResult<()> {
        writer
            .write_u8(SNAPSHOT_VERSION)
            .map_err(|e| DictionaryError::Io(e.to_string()))?;

        let header = SnapshotHeader {
            maxlen: self.maxlen as u64,
            entries: self.payloads.len() as u64,
            queue: self.queue.len() as u64,
        };
        let header_bytes =
            rmp_serde::to_vec(&header).map_err(|e| DictionaryError::Serialization(e.to_string()))?;
        writer
            .write_u32::<LittleEndian>(header_bytes.len() as u32)
            .map_err(|e| DictionaryError::Io(e.to_string()))?;
        writer
            .write_all(&header_bytes)
            .map_err(|e| DictionaryError::Io(e.to_string()))?;

        for id in self.payloads.sorted_ids() {
            let payload = self
                .payloads
                .get(id)
                .ok_or(DictionaryError::StaleReference { id })?;

            writer
                .write_u64::<LittleEndian>(id.as_u64())
                .map_err(|e| DictionaryError::Io(e.to_string()))?;
            writer
                .write_u32::<LittleEndian>(payload.embedding.len() as u32)
                .map_err(|e| DictionaryError::Io(e.to_string()))?;
            for &value in &payload.embedding {
                writer
                    .write_f32::<LittleEndian>(value)
                    .map_err(|e| DictionaryError::Io(e.to_string()))?;
            }

            let value_bytes = rmp_serde::to_vec(&payload.value)
                .map_err(|e| DictionaryError::Serialization(e.to_string()))?;
            writer
                .write_u32::<LittleEndian>(value_bytes.len() as u32)
                .map_err(|e| DictionaryError::Io(e.to_string()))?;
            writer
                .write_all(&value_bytes)
                .map_err(|e| DictionaryError::Io(e.to_string()))?;
        }

        for id in self.queue.iter() {
            writer
                .write_u64::<LittleEndian>(id.as_u64())
                .map_err(|e| DictionaryError::Io(e.to_string()))?;
        }

        Ok(())
    }

    /// Replace this dictionary's state with a deserialized snapshot
    ///
    /// Fails with `ConfigMismatch` if the stored capacity differs from the
    /// instance's. Any entries held before the call are discarded.
    pub fn snapshot_read<R: Read>(&mut self, reader: &mut R) -> DictResult<()> {
        let version = reader
            .read_u8()
            .map_err(|e| DictionaryError::Io(e.to_string()))?;
        if version != SNAPSHOT_VERSION {
            return Err(DictionaryError::Snapshot(format!(
                "Unsupported snapshot version: {version}"
            )));
        }

        let header_len = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| DictionaryError::Io(e.to_string()))? as usize;
        let mut header_bytes = vec![0u8; header_len];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| DictionaryError::Io(e.to_string()))?;
        let header: SnapshotHeader = rmp_serde::from_slice(&header_bytes)
            .map_err(|e| DictionaryError::Serialization(e.to_string()))?;

        if header.maxlen as usize != self.maxlen {
            return Err(DictionaryError::ConfigMismatch {
                expected: self.maxlen,
                got: header.maxlen as usize,
            });
        }

        self.alloc.reset();
        self.payloads.clear();
        self.queue.clear();

        let mut remap: FxHashMap<EntryId, EntryId> = FxHashMap::default();
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(header.entries as usize);

        for _ in 0..header.entries {
            let old_id = EntryId::new(
                reader
                    .read_u64::<LittleEndian>()
                    .map_err(|e| DictionaryError::Io(e.to_string()))?,
            );

            let dimension = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| DictionaryError::Io(e.to_string()))?
                as usize;
            let mut embedding = vec![0.0f32; dimension];
            for value in &mut embedding {
                *value = reader
                    .read_f32::<LittleEndian>()
                    .map_err(|e| DictionaryError::Io(e.to_string()))?;
            }

            let value_len = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| DictionaryError::Io(e.to_string()))?
                as usize;
            let mut value_bytes = vec![0u8; value_len];
            reader
                .read_exact(&mut value_bytes)
                .map_err(|e| DictionaryError::Io(e.to_string()))?;
            let value: PayloadValue = rmp_serde::from_slice(&value_bytes)
                .map_err(|e| DictionaryError::Serialization(e.to_string()))?;

            // Fresh id space: the new ids cannot collide with anything the
            // allocator handed out before the reset.
            let new_id = self.alloc.next_id();
            remap.insert(old_id, new_id);
            embeddings.push(embedding.clone());
            self.payloads.put(new_id, Payload { embedding, value });
        }

        // Rebuild the index over the stored embeddings in allocation order,
        // so index positions land on the renumbered ids. The clear is
        // unconditional: an empty snapshot must still discard whatever the
        // index held before, leaving it unbuilt like a fresh instance.
        self.index.clear();
        if !embeddings.is_empty() {
            self.index.build(&embeddings)?;
        }

        let mut dropped = 0usize;
        for _ in 0..header.queue {
            let old_id = EntryId::new(
                reader
                    .read_u64::<LittleEndian>()
                    .map_err(|e| DictionaryError::Io(e.to_string()))?,
            );
            match remap.get(&old_id) {
                Some(new_id) => self.queue.push_back(*new_id),
                // Stale at save time: no live payload, nothing to replay.
                None => dropped += 1,
            }
        }

        info!(
            target: "replay::snapshot",
            entries = self.payloads.len(),
            queued = self.queue.len(),
            dropped_stale = dropped,
            "Snapshot restored"
        );
        Ok(())
    }

    /// Write a snapshot into `dir` under the conventional name
    ///
    /// Returns the path written. See [`snapshot_path`] for the naming rule.
    pub fn save_to_dir(
        &self,
        dir: &Path,
        name: &str,
        iteration: Option<u64>,
    ) -> DictResult<PathBuf> {
        let path = snapshot_path(dir, name, iteration);
        let file = File::create(&path).map_err(|e| DictionaryError::Io(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        self.snapshot_write(&mut writer)?;
        writer
            .flush()
            .map_err(|e| DictionaryError::Io(e.to_string()))?;
        Ok(path)
    }

    /// Restore state from a snapshot file
    pub fn restore_from_path(&mut self, path: &Path) -> DictResult<()> {
        let file = File::open(path).map_err(|e| DictionaryError::Io(e.to_string()))?;
        let mut reader = BufReader::new(file);
        self.snapshot_read(&mut reader)
    }
}
