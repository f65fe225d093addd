//! In-process chunk store.
//!
//! The reference [`ChunkStore`] backend: plain maps guarded by a
//! read-write lock, with a prefix index for lookups. Suitable for
//! tests, tools, and deployments that rebuild state on start.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use shavar_core::{
    AddChunk, ChunkRanges, FullHashEntry, ListName, Prefix, PrefixData, SubChunk, Timestamp,
};
use tracing::debug;

use crate::{ChunkStore, StoreError};

#[derive(Default)]
struct ListState {
    /// Add records by chunk number.
    adds: BTreeMap<u32, HashSet<PrefixData>>,
    /// Sub records by chunk number, each entry `(add_number, prefix)`.
    subs: BTreeMap<u32, HashSet<(u32, PrefixData)>>,
    /// Lookup index: 4-byte prefix to `(chunk_number, prefix)`.
    add_index: HashMap<Prefix, HashSet<(u32, PrefixData)>>,
    /// Lookup index: 4-byte prefix to `(chunk_number, add_number, prefix)`.
    sub_index: HashMap<Prefix, HashSet<(u32, u32, PrefixData)>>,
    /// Resolved full hashes by prefix.
    full_hashes: HashMap<Prefix, Vec<FullHashEntry>>,
}

/// In-memory [`ChunkStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    lists: RwLock<HashMap<ListName, ListState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of add records across all lists.
    pub fn add_record_count(&self) -> usize {
        self.lists
            .read()
            .values()
            .map(|s| s.adds.values().map(HashSet::len).sum::<usize>())
            .sum()
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn ranges(&self, list: &ListName) -> Result<(ChunkRanges, ChunkRanges), StoreError> {
        let lists = self.lists.read();
        let Some(state) = lists.get(list) else {
            return Ok((ChunkRanges::new(), ChunkRanges::new()));
        };
        let adds = state.adds.keys().copied().collect();
        let subs = state.subs.keys().copied().collect();
        Ok((adds, subs))
    }

    async fn delete_add_chunks(
        &self,
        list: &ListName,
        chunk_numbers: &[u32],
    ) -> Result<(), StoreError> {
        let mut lists = self.lists.write();
        let Some(state) = lists.get_mut(list) else {
            return Ok(());
        };
        for &n in chunk_numbers {
            let Some(prefixes) = state.adds.remove(&n) else {
                continue;
            };
            for prefix in prefixes {
                if let Some(key) = prefix.lookup_prefix() {
                    if let Some(indexed) = state.add_index.get_mut(&key) {
                        indexed.remove(&(n, prefix));
                        if indexed.is_empty() {
                            state.add_index.remove(&key);
                        }
                    }
                }
            }
        }
        debug!(list = %list, count = chunk_numbers.len(), "deleted add chunks");
        Ok(())
    }

    async fn delete_sub_chunks(
        &self,
        list: &ListName,
        chunk_numbers: &[u32],
    ) -> Result<(), StoreError> {
        let mut lists = self.lists.write();
        let Some(state) = lists.get_mut(list) else {
            return Ok(());
        };
        for &n in chunk_numbers {
            let Some(entries) = state.subs.remove(&n) else {
                continue;
            };
            for (add_number, prefix) in entries {
                if let Some(key) = prefix.lookup_prefix() {
                    if let Some(indexed) = state.sub_index.get_mut(&key) {
                        indexed.remove(&(n, add_number, prefix));
                        if indexed.is_empty() {
                            state.sub_index.remove(&key);
                        }
                    }
                }
            }
        }
        debug!(list = %list, count = chunk_numbers.len(), "deleted sub chunks");
        Ok(())
    }

    async fn add_chunks_by_prefix(
        &self,
        prefix: Prefix,
        lists: &[ListName],
    ) -> Result<Vec<AddChunk>, StoreError> {
        let all = self.lists.read();
        let mut out = Vec::new();
        for list in lists {
            let Some(state) = all.get(list) else { continue };
            let Some(indexed) = state.add_index.get(&prefix) else {
                continue;
            };
            for (chunk_number, data) in indexed {
                out.push(AddChunk {
                    list: list.clone(),
                    chunk_number: *chunk_number,
                    prefix: data.clone(),
                });
            }
        }
        Ok(out)
    }

    async fn sub_chunks_by_prefix(
        &self,
        prefix: Prefix,
        lists: &[ListName],
    ) -> Result<Vec<SubChunk>, StoreError> {
        let all = self.lists.read();
        let mut out = Vec::new();
        for list in lists {
            let Some(state) = all.get(list) else { continue };
            let Some(indexed) = state.sub_index.get(&prefix) else {
                continue;
            };
            for (chunk_number, add_number, data) in indexed {
                out.push(SubChunk {
                    list: list.clone(),
                    chunk_number: *chunk_number,
                    add_chunk_number: *add_number,
                    prefix: data.clone(),
                });
            }
        }
        Ok(out)
    }

    async fn put_add_chunks(&self, chunks: Vec<AddChunk>) -> Result<(), StoreError> {
        let mut lists = self.lists.write();
        for chunk in chunks {
            let state = lists.entry(chunk.list).or_default();
            let inserted = state
                .adds
                .entry(chunk.chunk_number)
                .or_default()
                .insert(chunk.prefix.clone());
            if inserted {
                if let Some(key) = chunk.prefix.lookup_prefix() {
                    state
                        .add_index
                        .entry(key)
                        .or_default()
                        .insert((chunk.chunk_number, chunk.prefix));
                }
            }
        }
        Ok(())
    }

    async fn put_sub_chunks(&self, chunks: Vec<SubChunk>) -> Result<(), StoreError> {
        let mut lists = self.lists.write();
        for chunk in chunks {
            let state = lists.entry(chunk.list).or_default();
            let inserted = state
                .subs
                .entry(chunk.chunk_number)
                .or_default()
                .insert((chunk.add_chunk_number, chunk.prefix.clone()));
            if inserted {
                if let Some(key) = chunk.prefix.lookup_prefix() {
                    state.sub_index.entry(key).or_default().insert((
                        chunk.chunk_number,
                        chunk.add_chunk_number,
                        chunk.prefix,
                    ));
                }
            }
        }
        Ok(())
    }

    async fn full_hashes(
        &self,
        prefix: Prefix,
        list: &ListName,
        now: Timestamp,
    ) -> Result<Vec<FullHashEntry>, StoreError> {
        let mut lists = self.lists.write();
        let Some(state) = lists.get_mut(list) else {
            return Ok(Vec::new());
        };
        let Some(entries) = state.full_hashes.get_mut(&prefix) else {
            return Ok(Vec::new());
        };
        // Expire on read: there is no background sweeper.
        entries.retain(|e| e.is_valid_at(now));
        let out = entries.clone();
        if entries.is_empty() {
            state.full_hashes.remove(&prefix);
        }
        Ok(out)
    }

    async fn put_full_hashes(&self, entries: Vec<FullHashEntry>) -> Result<(), StoreError> {
        let mut lists = self.lists.write();
        for entry in entries {
            let state = lists.entry(entry.list.clone()).or_default();
            let bucket = state.full_hashes.entry(entry.hash.prefix()).or_default();
            match bucket
                .iter_mut()
                .find(|e| e.list == entry.list && e.hash == entry.hash)
            {
                Some(existing) => {
                    existing.valid_until = existing.valid_until.max(entry.valid_until)
                }
                None => bucket.push(entry),
            }
        }
        Ok(())
    }

    async fn reset(&self, list: &ListName) -> Result<(), StoreError> {
        let removed = self.lists.write().remove(list).is_some();
        debug!(list = %list, removed, "reset list");
        Ok(())
    }
}
