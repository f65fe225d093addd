//! Scripted transport.
//!
//! Responses are queued per endpoint and handed out in order; every
//! request is recorded for assertions. An exhausted queue answers with
//! an HTTP error so a test that issues more requests than it scripted
//! fails loudly instead of hanging.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use shavar_client::{Transport, TransportError};

/// Transport that replays canned responses.
#[derive(Default)]
pub struct ScriptedTransport {
    update_responses: Mutex<VecDeque<Result<String, TransportError>>>,
    redirect_responses: Mutex<VecDeque<Result<Bytes, TransportError>>>,
    gethash_responses: Mutex<VecDeque<Result<Bytes, TransportError>>>,
    update_requests: Mutex<Vec<(String, String)>>,
    redirect_requests: Mutex<Vec<String>>,
    gethash_requests: Mutex<Vec<(String, Vec<u8>)>>,
    response_delay: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a downloads response.
    pub fn push_update_response(&self, response: Result<&str, TransportError>) {
        self.update_responses
            .lock()
            .push_back(response.map(str::to_string));
    }

    /// Queues a redirect payload.
    pub fn push_redirect_response(&self, response: Result<Vec<u8>, TransportError>) {
        self.redirect_responses
            .lock()
            .push_back(response.map(Bytes::from));
    }

    /// Queues a gethash response.
    pub fn push_gethash_response(&self, response: Result<Vec<u8>, TransportError>) {
        self.gethash_responses
            .lock()
            .push_back(response.map(Bytes::from));
    }

    /// Delays every response, for tests that need a request to stay in
    /// flight.
    pub fn set_response_delay(&self, delay: Duration) {
        *self.response_delay.lock() = Some(delay);
    }

    /// Recorded downloads requests as `(url, body)` pairs.
    pub fn update_requests(&self) -> Vec<(String, String)> {
        self.update_requests.lock().clone()
    }

    /// Recorded redirect fetches.
    pub fn redirect_requests(&self) -> Vec<String> {
        self.redirect_requests.lock().clone()
    }

    /// Recorded gethash requests as `(url, body)` pairs.
    pub fn gethash_requests(&self) -> Vec<(String, Vec<u8>)> {
        self.gethash_requests.lock().clone()
    }

    async fn delay(&self) {
        let delay = *self.response_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn exhausted() -> TransportError {
        TransportError::Http("script exhausted".to_string())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_update(&self, url: &str, body: String) -> Result<String, TransportError> {
        self.update_requests
            .lock()
            .push((url.to_string(), body));
        self.delay().await;
        self.update_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted()))
    }

    async fn fetch_redirect(&self, url: &str) -> Result<Bytes, TransportError> {
        self.redirect_requests.lock().push(url.to_string());
        self.delay().await;
        self.redirect_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted()))
    }

    async fn post_gethash(&self, url: &str, body: Vec<u8>) -> Result<Bytes, TransportError> {
        self.gethash_requests
            .lock()
            .push((url.to_string(), body));
        self.delay().await;
        self.gethash_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted()))
    }
}
