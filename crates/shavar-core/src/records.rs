//! Chunk and full-hash record types.
//!
//! These are the rows the chunk store persists: add-chunk entries,
//! sub-chunk entries that cancel them, and resolved full hashes with
//! their expiry.

use serde::{Deserialize, Serialize};

use crate::identifiers::{FullHash, ListName, PrefixData};
use crate::time::Timestamp;

/// An add-chunk entry: the prefix is asserted to be on the list.
///
/// Unique per `(list, chunk_number, prefix)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddChunk {
    /// Owning list.
    pub list: ListName,
    /// Chunk number within the list's add sequence.
    pub chunk_number: u32,
    /// Asserted prefix; empty for an empty-chunk announcement.
    pub prefix: PrefixData,
}

/// A sub-chunk entry: cancels the matching `(list, add_chunk_number,
/// prefix)` add entry.
///
/// Unique per `(list, chunk_number, add_chunk_number, prefix)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubChunk {
    /// Owning list.
    pub list: ListName,
    /// Chunk number within the list's sub sequence.
    pub chunk_number: u32,
    /// The add-chunk number this entry retracts from.
    pub add_chunk_number: u32,
    /// Retracted prefix; empty for an empty-chunk announcement.
    pub prefix: PrefixData,
}

/// A resolved full hash with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullHashEntry {
    /// List the hash was returned for.
    pub list: ListName,
    /// The authoritative 32-byte hash.
    pub hash: FullHash,
    /// Absolute expiry; entries at or past this instant are dead.
    pub valid_until: Timestamp,
}

impl FullHashEntry {
    /// Returns true when the entry is still usable at `now`.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        now.is_before(&self.valid_until)
    }
}
