//! Shavar Store - Chunk store contract and reference backends.
//!
//! The chunk store holds add-chunk and sub-chunk records plus resolved
//! full hashes. Backends are swappable behind the [`ChunkStore`]
//! capability trait; this crate ships an in-process [`MemoryStore`] and
//! the file-backed [`ScratchStore`] used for retry state.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod memory;
pub mod scratch;

pub use memory::MemoryStore;
pub use scratch::ScratchStore;

use async_trait::async_trait;
use shavar_core::{
    AddChunk, ChunkRanges, FullHashEntry, ListName, Prefix, SubChunk, Timestamp,
};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend error
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Stored data failed to decode
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Capability contract for the chunk store.
///
/// Implementations own record uniqueness (one add record per
/// `(list, chunk_number, prefix)`, one sub record per
/// `(list, chunk_number, add_chunk_number, prefix)`) and must never
/// return a full hash at or past its expiry: there is no background
/// sweeper, so expiry is enforced on read.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Returns the add and sub chunk-number ranges currently held for a
    /// list.
    async fn ranges(&self, list: &ListName) -> Result<(ChunkRanges, ChunkRanges), StoreError>;

    /// Removes every add record with one of the given chunk numbers.
    async fn delete_add_chunks(
        &self,
        list: &ListName,
        chunk_numbers: &[u32],
    ) -> Result<(), StoreError>;

    /// Removes every sub record with one of the given chunk numbers.
    async fn delete_sub_chunks(
        &self,
        list: &ListName,
        chunk_numbers: &[u32],
    ) -> Result<(), StoreError>;

    /// Returns add records whose entry starts with the given 4-byte
    /// prefix, across the given lists.
    async fn add_chunks_by_prefix(
        &self,
        prefix: Prefix,
        lists: &[ListName],
    ) -> Result<Vec<AddChunk>, StoreError>;

    /// Returns sub records whose entry starts with the given 4-byte
    /// prefix, across the given lists.
    async fn sub_chunks_by_prefix(
        &self,
        prefix: Prefix,
        lists: &[ListName],
    ) -> Result<Vec<SubChunk>, StoreError>;

    /// Inserts add records. Idempotent.
    async fn put_add_chunks(&self, chunks: Vec<AddChunk>) -> Result<(), StoreError>;

    /// Inserts sub records. Idempotent.
    async fn put_sub_chunks(&self, chunks: Vec<SubChunk>) -> Result<(), StoreError>;

    /// Returns unexpired full hashes for a prefix and list, purging any
    /// expired records it encounters.
    async fn full_hashes(
        &self,
        prefix: Prefix,
        list: &ListName,
        now: Timestamp,
    ) -> Result<Vec<FullHashEntry>, StoreError>;

    /// Inserts resolved full hashes. Idempotent; an existing record for
    /// the same `(list, hash)` takes the later expiry.
    async fn put_full_hashes(&self, entries: Vec<FullHashEntry>) -> Result<(), StoreError>;

    /// Drops every add, sub, and full-hash record for a list.
    async fn reset(&self, list: &ListName) -> Result<(), StoreError>;
}
