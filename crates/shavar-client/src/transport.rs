//! HTTP transport.
//!
//! The update engine and resolver speak to the service through the
//! [`Transport`] trait so tests can script responses. The production
//! implementation is a thin [`reqwest`] wrapper with certificate
//! verification on, the configured timeout, and the configured user
//! agent.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Non-2xx response status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Connection, TLS, or protocol failure
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// Abstract transport to the list service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts a downloads request and returns the response header text.
    async fn post_update(&self, url: &str, body: String) -> Result<String, TransportError>;

    /// Fetches a redirect's binary chunk payload.
    async fn fetch_redirect(&self, url: &str) -> Result<Bytes, TransportError>;

    /// Posts a gethash request and returns the raw response body.
    async fn post_gethash(&self, url: &str, body: Vec<u8>) -> Result<Bytes, TransportError>;
}

/// Production transport over HTTPS.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the transport from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    fn check_status(response: &reqwest::Response) -> Result<(), TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_update(&self, url: &str, body: String) -> Result<String, TransportError> {
        debug!(url, body_len = body.len(), "posting downloads request");
        let response = self.client.post(url).body(body).send().await?;
        Self::check_status(&response)?;
        Ok(response.text().await?)
    }

    async fn fetch_redirect(&self, url: &str) -> Result<Bytes, TransportError> {
        debug!(url, "fetching redirect payload");
        let response = self.client.get(url).send().await?;
        Self::check_status(&response)?;
        Ok(response.bytes().await?)
    }

    async fn post_gethash(&self, url: &str, body: Vec<u8>) -> Result<Bytes, TransportError> {
        debug!(url, body_len = body.len(), "posting gethash request");
        let response = self.client.post(url).body(body).send().await?;
        Self::check_status(&response)?;
        Ok(response.bytes().await?)
    }
}
