//! Ready-wired test client.

use std::sync::Arc;

use shavar_client::backoff::{PrefixErrorState, UpdatedState};
use shavar_client::{Client, ClientConfig};
use shavar_core::{ListName, Prefix};
use shavar_store::scratch::{full_hash_errors_key, updated_key};
use shavar_store::{MemoryStore, ScratchStore};
use tempfile::TempDir;

use crate::script::ScriptedTransport;

/// A client wired to a scripted transport and an in-memory store.
pub struct TestHarness {
    /// The scripted transport, for queueing responses and inspecting
    /// requests.
    pub transport: Arc<ScriptedTransport>,
    /// The backing store, for seeding and inspecting records.
    pub store: Arc<MemoryStore>,
    /// The client under test.
    pub client: Client,
    scratch_path: std::path::PathBuf,
    _tmp: TempDir,
}

impl TestHarness {
    /// Creates a harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Creates a harness after letting the caller adjust the
    /// configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ClientConfig)) -> Self {
        Self::with_scratch(|_| {}, adjust)
    }

    /// Creates a harness with pre-seeded scratch state, for scenarios
    /// whose retry windows cannot elapse inside a test.
    pub fn with_scratch(
        seed: impl FnOnce(&ScratchStore),
        adjust: impl FnOnce(&mut ClientConfig),
    ) -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let scratch_path = tmp.path().join("scratch.json");

        {
            let scratch = ScratchStore::open(&scratch_path).expect("open scratch");
            seed(&scratch);
        }

        let mut config = ClientConfig::new("https://sb.example.com/", "test-key");
        config.data_file_path = scratch_path.clone();
        adjust(&mut config);

        let transport = Arc::new(ScriptedTransport::new());
        let store = Arc::new(MemoryStore::new());
        let client = Client::with_transport(config, store.clone(), transport.clone())
            .expect("client construction");

        Self {
            transport,
            store,
            client,
            scratch_path,
            _tmp: tmp,
        }
    }

    /// Reads a list's persisted update record.
    pub fn updated_state(&self, list: &ListName) -> Option<UpdatedState> {
        let scratch = ScratchStore::open(&self.scratch_path).expect("open scratch");
        scratch.get(&updated_key(list))
    }

    /// Reads a prefix's persisted gethash error record.
    pub fn prefix_error_state(&self, prefix: &Prefix) -> Option<PrefixErrorState> {
        let scratch = ScratchStore::open(&self.scratch_path).expect("open scratch");
        scratch.get(&full_hash_errors_key(prefix))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for building a validated list name.
pub fn list(name: &str) -> ListName {
    ListName::new(name).expect("valid list name")
}
