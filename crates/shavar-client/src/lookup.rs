//! The lookup pipeline.
//!
//! Canonicalize the URL, hash every canonical form, find surviving add
//! records for each 4-byte prefix, resolve candidates to full hashes,
//! and intersect those with the URL's own hashes.

use std::collections::BTreeSet;
use std::sync::Arc;

use shavar_core::{FullHash, ListName, Timestamp};
use shavar_store::ChunkStore;
use tracing::debug;

use crate::resolver::{Candidate, Resolver};
use crate::ClientError;

/// Returns the names of the lists the URL matches, ordered by
/// resolution order with duplicates collapsed.
pub(crate) async fn run_lookup(
    store: &Arc<dyn ChunkStore>,
    resolver: &Resolver,
    lists: &[ListName],
    url: &str,
) -> Result<Vec<ListName>, ClientError> {
    let url_hashes: BTreeSet<FullHash> = shavar_url::full_hashes(url)?;
    let prefixes: BTreeSet<_> = url_hashes.iter().map(FullHash::prefix).collect();
    let now = Timestamp::now();

    let mut matched: Vec<ListName> = Vec::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for prefix in prefixes {
        let adds = store.add_chunks_by_prefix(prefix, lists).await?;
        if adds.is_empty() {
            continue;
        }
        let subs = store.sub_chunks_by_prefix(prefix, lists).await?;

        // Pairwise subtraction: a sub entry cancels the add entry with
        // its add-chunk number and prefix on the same list.
        let surviving: Vec<_> = adds
            .into_iter()
            .filter(|add| {
                !add.prefix.is_empty()
                    && !subs.iter().any(|sub| {
                        sub.list == add.list
                            && sub.add_chunk_number == add.chunk_number
                            && sub.prefix == add.prefix
                    })
            })
            .collect();
        if surviving.is_empty() {
            continue;
        }
        debug!(prefix = %prefix, candidates = surviving.len(), "local prefix hit");

        let mut unresolved_lists: Vec<ListName> = Vec::new();
        for add in surviving {
            if let Some(full) = add.prefix.as_full_hash() {
                // A stored 32-byte entry is already authoritative.
                if url_hashes.contains(&full) {
                    matched.push(add.list);
                }
            } else if !unresolved_lists.contains(&add.list) {
                unresolved_lists.push(add.list);
            }
        }
        if !unresolved_lists.is_empty() {
            candidates.push((prefix, unresolved_lists));
        }
    }

    if !candidates.is_empty() {
        let resolved = resolver.resolve(&candidates, now).await?;
        for (prefix, candidate_lists) in &candidates {
            for (list, hash) in &resolved {
                if hash.prefix() == *prefix
                    && candidate_lists.contains(list)
                    && url_hashes.contains(hash)
                {
                    matched.push(list.clone());
                }
            }
        }
    }

    let mut out: Vec<ListName> = Vec::new();
    for list in matched {
        if !out.contains(&list) {
            out.push(list);
        }
    }
    Ok(out)
}
