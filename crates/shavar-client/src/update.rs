//! The update engine.
//!
//! Drives each list through one poll: compose the ranged downloads
//! request, post it, parse the directive header, apply delete ranges,
//! fetch every redirect payload, and bulk-apply its chunks. Lists are
//! serialized individually (a list already in flight yields the default
//! retry immediately) but independent of each other. The per-list
//! update record is committed only once the whole pipeline has
//! succeeded; failures commit the bumped error counter and its backoff
//! wait instead.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, try_join_all};
use parking_lot::Mutex;
use shavar_core::{
    AddChunk, ListName, PrefixData, SubChunk, Timestamp, DELETE_BATCH_LEN, INSERT_BATCH_LEN,
};
use shavar_proto::{
    compose_download_body, parse_chunk_stream, parse_update_response, ParsedChunk,
};
use shavar_store::scratch::updated_key;
use shavar_store::{ChunkStore, ScratchStore};
use tracing::{debug, info, warn};

use crate::backoff::{update_backoff_secs, UpdatedState, RESET_RETRY_SECS};
use crate::config::ClientConfig;
use crate::transport::Transport;
use crate::ClientError;

pub(crate) struct UpdateEngine {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ChunkStore>,
    scratch: Arc<ScratchStore>,
    in_flight: Mutex<HashSet<ListName>>,
}

impl UpdateEngine {
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
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Updates every list that is due (or all of them when forced) and
    /// returns the shortest wait until the next poll is useful.
    pub(crate) async fn update(&self, lists: &[ListName], force: bool) -> Duration {
        let waits = join_all(lists.iter().map(|list| self.update_list(list, force))).await;
        waits
            .into_iter()
            .min()
            .unwrap_or(Duration::from_secs(u64::from(self.config.default_retry_secs)))
    }

    async fn update_list(&self, list: &ListName, force: bool) -> Duration {
        // One request in flight per list; concurrent callers bounce.
        if !self.in_flight.lock().insert(list.clone()) {
            debug!(list = %list, "update already in flight");
            return Duration::from_secs(u64::from(self.config.default_retry_secs));
        }
        let wait = self.update_list_guarded(list, force).await;
        self.in_flight.lock().remove(list);
        wait
    }

    async fn update_list_guarded(&self, list: &ListName, force: bool) -> Duration {
        let now = Timestamp::now();
        let state: UpdatedState = self.scratch.get(&updated_key(list)).unwrap_or_default();

        if !force {
            let due = Timestamp::new(state.time).add_secs(i64::from(state.wait));
            if now.is_before(&due) {
                debug!(list = %list, until = %due, "list not due yet");
                return now.duration_until(&due);
            }
        }

        match self.run_update(list).await {
            Ok(wait) => {
                info!(list = %list, wait, "update succeeded");
                self.commit_state(
                    list,
                    UpdatedState {
                        time: now.as_secs(),
                        wait,
                        errors: 0,
                    },
                );
                Duration::from_secs(u64::from(wait))
            }
            Err(error) => {
                let errors = state.errors + 1;
                let wait = update_backoff_secs(errors);
                warn!(list = %list, %error, errors, wait, "update failed, backing off");
                self.commit_state(
                    list,
                    UpdatedState {
                        time: now.as_secs(),
                        wait,
                        errors,
                    },
                );
                Duration::from_secs(u64::from(wait))
            }
        }
    }

    fn commit_state(&self, list: &ListName, state: UpdatedState) {
        if let Err(error) = self.scratch.put(&updated_key(list), &state) {
            warn!(list = %list, %error, "failed to persist update state");
        }
    }

    /// One full poll for a list. Returns the wait until the next poll.
    async fn run_update(&self, list: &ListName) -> Result<u32, ClientError> {
        let (add_ranges, sub_ranges) = self.store.ranges(list).await?;
        let body = compose_download_body(list, &add_ranges, &sub_ranges)?;
        let text = self
            .transport
            .post_update(&self.config.downloads_url(), body)
            .await?;

        // A bare 200 carries no directives.
        if text.trim().is_empty() {
            return Ok(self.config.default_retry_secs);
        }

        let directives = parse_update_response(&text)?;
        let wait = directives
            .next_poll_secs
            .unwrap_or(self.config.default_retry_secs);

        let Some(for_list) = directives.for_list(list) else {
            return Ok(wait);
        };

        if for_list.reset {
            info!(list = %list, "server requested reset");
            self.store.reset(list).await?;
            return Ok(RESET_RETRY_SECS);
        }

        let delete_adds: Vec<u32> = for_list.delete_adds.iter().collect();
        for batch in delete_adds.chunks(DELETE_BATCH_LEN) {
            self.store.delete_add_chunks(list, batch).await?;
        }
        let delete_subs: Vec<u32> = for_list.delete_subs.iter().collect();
        for batch in delete_subs.chunks(DELETE_BATCH_LEN) {
            self.store.delete_sub_chunks(list, batch).await?;
        }

        for redirect in &for_list.redirects {
            let url = format!("https://{redirect}");
            let payload = self.transport.fetch_redirect(&url).await?;
            let chunks = parse_chunk_stream(&payload)?;
            debug!(list = %list, redirect, chunks = chunks.len(), "applying redirect payload");
            self.apply_chunks(list, chunks).await?;
        }

        Ok(wait)
    }

    /// Bulk-applies one payload's chunks. Batches are dispatched
    /// together and the update only proceeds once every batch has been
    /// acknowledged.
    async fn apply_chunks(
        &self,
        list: &ListName,
        chunks: Vec<ParsedChunk>,
    ) -> Result<(), ClientError> {
        let mut adds: Vec<AddChunk> = Vec::new();
        let mut subs: Vec<SubChunk> = Vec::new();

        for chunk in chunks {
            match chunk {
                ParsedChunk::Add {
                    chunk_number,
                    prefixes,
                } => {
                    if prefixes.is_empty() {
                        // Empty chunks still claim their number so the
                        // next request reports it held.
                        adds.push(AddChunk {
                            list: list.clone(),
                            chunk_number,
                            prefix: PrefixData::empty(),
                        });
                    }
                    for prefix in prefixes {
                        adds.push(AddChunk {
                            list: list.clone(),
                            chunk_number,
                            prefix,
                        });
                    }
                }
                ParsedChunk::Sub {
                    chunk_number,
                    entries,
                } => {
                    if entries.is_empty() {
                        subs.push(SubChunk {
                            list: list.clone(),
                            chunk_number,
                            add_chunk_number: 0,
                            prefix: PrefixData::empty(),
                        });
                    }
                    for (add_chunk_number, prefix) in entries {
                        subs.push(SubChunk {
                            list: list.clone(),
                            chunk_number,
                            add_chunk_number,
                            prefix,
                        });
                    }
                }
            }
        }

        let add_batches = try_join_all(
            adds.chunks(INSERT_BATCH_LEN)
                .map(|batch| self.store.put_add_chunks(batch.to_vec())),
        );
        let sub_batches = try_join_all(
            subs.chunks(INSERT_BATCH_LEN)
                .map(|batch| self.store.put_sub_chunks(batch.to_vec())),
        );
        futures::try_join!(add_batches, sub_batches)?;
        Ok(())
    }
}
