//! Full-hash cache and resolver.
//!
//! Candidate prefixes resolve to authoritative 32-byte hashes. Cached
//! entries are served while their expiry holds; the rest go out in one
//! batched gethash request, minus any prefix sitting in a suppression
//! window from earlier failures.

use std::sync::Arc;

use shavar_core::{FullHash, FullHashEntry, ListName, Prefix, Timestamp};
use shavar_proto::{encode_gethash_body, parse_gethash_response};
use shavar_store::scratch::full_hash_errors_key;
use shavar_store::{ChunkStore, ScratchStore};
use tracing::{debug, warn};

use crate::backoff::{gethash_allowed, record_gethash_failure, PrefixErrorState};
use crate::config::ClientConfig;
use crate::transport::Transport;
use crate::ClientError;

/// A prefix to resolve, with the lists whose add records produced it.
pub(crate) type Candidate = (Prefix, Vec<ListName>);

pub(crate) struct Resolver {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ChunkStore>,
    scratch: Arc<ScratchStore>,
}

impl Resolver {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ChunkStore>,
        scratch: Arc<ScratchStore>,
    ) -> Self {
        Self {
            config,
            transport,
            store,
            scratch,
        }
    }

    /// Resolves candidate prefixes to `(list, hash)` pairs.
    ///
    /// Prefixes with live cached hashes are answered locally. The rest
    /// are batched into one gethash request unless suppressed; a failed
    /// request records a failure against every batched prefix and the
    /// caller simply sees no hashes for them.
    pub(crate) async fn resolve(
        &self,
        candidates: &[Candidate],
        now: Timestamp,
    ) -> Result<Vec<(ListName, FullHash)>, ClientError> {
        let mut resolved: Vec<(ListName, FullHash)> = Vec::new();
        let mut uncached: Vec<Prefix> = Vec::new();

        for (prefix, lists) in candidates {
            let mut cached: Vec<FullHashEntry> = Vec::new();
            for list in lists {
                cached.extend(self.store.full_hashes(*prefix, list, now).await?);
            }
            if cached.is_empty() {
                uncached.push(*prefix);
            } else {
                debug!(prefix = %prefix, hits = cached.len(), "full hashes served from cache");
                resolved.extend(cached.into_iter().map(|e| (e.list, e.hash)));
            }
        }

        let batch: Vec<Prefix> = uncached
            .into_iter()
            .filter(|prefix| {
                match self
                    .scratch
                    .get::<PrefixErrorState>(&full_hash_errors_key(prefix))
                {
                    Some(state) => gethash_allowed(&state, now),
                    None => true,
                }
            })
            .collect();
        if batch.is_empty() {
            return Ok(resolved);
        }

        let body = encode_gethash_body(&batch);
        let outcome = self
            .transport
            .post_gethash(&self.config.gethash_url(), body)
            .await
            .map_err(ClientError::from)
            .and_then(|payload| parse_gethash_response(&payload).map_err(ClientError::from));

        match outcome {
            Ok(response) => {
                // A configured cache time beats the server's lifetime.
                let lifetime = self
                    .config
                    .cache_time
                    .unwrap_or(response.cache_lifetime_secs);
                let valid_until = now.add_secs(i64::from(lifetime));
                let entries: Vec<FullHashEntry> = response
                    .hashes
                    .into_iter()
                    .map(|(list, hash)| FullHashEntry {
                        list,
                        hash,
                        valid_until,
                    })
                    .collect();
                debug!(
                    prefixes = batch.len(),
                    hashes = entries.len(),
                    lifetime,
                    "gethash resolved"
                );
                self.store.put_full_hashes(entries.clone()).await?;
                for prefix in &batch {
                    if let Err(error) = self.scratch.remove(&full_hash_errors_key(prefix)) {
                        warn!(prefix = %prefix, %error, "failed to clear gethash error state");
                    }
                }
                resolved.extend(entries.into_iter().map(|e| (e.list, e.hash)));
            }
            Err(error) => {
                warn!(%error, prefixes = batch.len(), "gethash failed, backing off prefixes");
                for prefix in &batch {
                    let key = full_hash_errors_key(prefix);
                    let state = record_gethash_failure(self.scratch.get(&key), now);
                    if let Err(error) = self.scratch.put(&key, &state) {
                        warn!(prefix = %prefix, %error, "failed to persist gethash error state");
                    }
                }
            }
        }

        Ok(resolved)
    }
}
