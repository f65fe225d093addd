//! Shavar Client - URL-reputation client for chunked blocklist
//! services.
//!
//! Mirrors the service's add/sub chunk streams into a local store,
//! matches URLs against the mirrored prefixes, and resolves candidate
//! matches to authoritative full hashes with caching and backoff.
//!
//! ```no_run
//! use std::sync::Arc;
//! use shavar_client::{Client, ClientConfig};
//! use shavar_core::ListName;
//! use shavar_store::MemoryStore;
//!
//! # async fn run() -> Result<(), shavar_client::ClientError> {
//! let config = ClientConfig::new("https://sb.example.com/", "my-api-key");
//! let client = Client::new(config, Arc::new(MemoryStore::new()))?;
//! let lists = vec![ListName::new("goog-malware-shavar").unwrap()];
//!
//! client.update(&lists).await;
//! let matches = client.lookup(&lists, "http://example.com/").await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod backoff;
pub mod config;
mod lookup;
mod resolver;
pub mod transport;
mod update;

pub use config::{ClientConfig, ConfigError};
pub use transport::{HttpTransport, Transport, TransportError};

use std::sync::Arc;
use std::time::Duration;

use shavar_core::ListName;
use shavar_proto::CodecError;
use shavar_store::{ChunkStore, ScratchStore, StoreError};
use shavar_url::CanonicalizeError;
use thiserror::Error;

use resolver::Resolver;
use update::UpdateEngine;

/// Errors from client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration; fatal at construction
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// URL could not be canonicalized
    #[error("Canonicalization error: {0}")]
    Canonicalize(#[from] CanonicalizeError),

    /// Malformed protocol payload
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// The URL-reputation client.
pub struct Client {
    engine: UpdateEngine,
    resolver: Resolver,
    store: Arc<dyn ChunkStore>,
}

impl Client {
    /// Creates a client over the production HTTP transport.
    pub fn new(config: ClientConfig, store: Arc<dyn ChunkStore>) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, store, transport)
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        store: Arc<dyn ChunkStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let scratch = Arc::new(ScratchStore::open(&config.data_file_path)?);
        let config = Arc::new(config);
        let engine = UpdateEngine::new(
            config.clone(),
            transport.clone(),
            store.clone(),
            scratch.clone(),
        );
        let resolver = Resolver::new(config, transport, store.clone(), scratch);
        Ok(Self {
            engine,
            resolver,
            store,
        })
    }

    /// Polls every due list and returns the shortest wait until another
    /// poll is useful.
    pub async fn update(&self, lists: &[ListName]) -> Duration {
        self.engine.update(lists, false).await
    }

    /// Polls every list regardless of its next-poll deadline.
    pub async fn force_update(&self, lists: &[ListName]) -> Duration {
        self.engine.update(lists, true).await
    }

    /// Returns the lists the URL currently matches.
    pub async fn lookup(
        &self,
        lists: &[ListName],
        url: &str,
    ) -> Result<Vec<ListName>, ClientError> {
        lookup::run_lookup(&self.store, &self.resolver, lists, url).await
    }
}
