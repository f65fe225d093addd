//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Client version string, advertised as `appver` and in the user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default protocol version string.
pub const DEFAULT_PROTOCOL_VERSION: &str = "3.0";

/// Default per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Default fallback poll interval, seconds.
pub const DEFAULT_RETRY_SECS: u32 = 30;

/// Configuration errors are fatal at construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No server URL configured
    #[error("Server URL is required")]
    MissingServer,

    /// No API key configured
    #[error("API key is required")]
    MissingKey,

    /// Server URL with a scheme other than http or https
    #[error("Server URL must be http or https: {0}")]
    BadServerUrl(String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the update service, with a trailing slash.
    pub server: String,
    /// API key.
    pub key: String,
    /// Protocol version advertised as `pver`.
    pub protocol_version: String,
    /// Path of the scratch-state file.
    pub data_file_path: PathBuf,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// HTTP user agent.
    pub user_agent: String,
    /// When set, overrides the server's cache lifetime for full hashes,
    /// seconds.
    pub cache_time: Option<u32>,
    /// Fallback poll interval, seconds.
    pub default_retry_secs: u32,
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the
    /// required server URL and API key.
    pub fn new(server: impl Into<String>, key: impl Into<String>) -> Self {
        let mut server = server.into();
        if !server.is_empty() && !server.ends_with('/') {
            server.push('/');
        }
        Self {
            server,
            key: key.into(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            data_file_path: std::env::temp_dir().join("shavar-scratch.json"),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: format!("shavar client {VERSION}"),
            cache_time: None,
            default_retry_secs: DEFAULT_RETRY_SECS,
        }
    }

    /// Validates the required options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.is_empty() {
            return Err(ConfigError::MissingServer);
        }
        if !self.server.starts_with("http://") && !self.server.starts_with("https://") {
            return Err(ConfigError::BadServerUrl(self.server.clone()));
        }
        if self.key.is_empty() {
            return Err(ConfigError::MissingKey);
        }
        Ok(())
    }

    /// URL of the downloads endpoint.
    pub fn downloads_url(&self) -> String {
        format!(
            "{}downloads?client=api&key={}&appver={}&pver={}",
            self.server, self.key, VERSION, self.protocol_version
        )
    }

    /// URL of the gethash endpoint.
    pub fn gethash_url(&self) -> String {
        format!(
            "{}gethash?client=api&key={}&appver={}&pver={}",
            self.server, self.key, VERSION, self.protocol_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_added() {
        let config = ClientConfig::new("https://sb.example.com", "k");
        assert_eq!(config.server, "https://sb.example.com/");
    }

    #[test]
    fn test_endpoint_urls() {
        let mut config = ClientConfig::new("https://sb.example.com/", "secret");
        config.protocol_version = "3.0".to_string();
        assert_eq!(
            config.downloads_url(),
            format!("https://sb.example.com/downloads?client=api&key=secret&appver={VERSION}&pver=3.0")
        );
        assert!(config.gethash_url().starts_with("https://sb.example.com/gethash?"));
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            ClientConfig::new("", "k").validate(),
            Err(ConfigError::MissingServer)
        );
        assert_eq!(
            ClientConfig::new("https://sb.example.com/", "").validate(),
            Err(ConfigError::MissingKey)
        );
        assert!(matches!(
            ClientConfig::new("ftp://sb.example.com/", "k").validate(),
            Err(ConfigError::BadServerUrl(_))
        ));
        assert!(ClientConfig::new("https://sb.example.com/", "k")
            .validate()
            .is_ok());
    }
}
