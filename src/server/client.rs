//! Client for a running viewer server
//!
//! Used by a second `mo` invocation to find out whether a server is already
//! listening and to hand it files instead of starting its own.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::api::AddFileRequest;
use super::registry::{FileEntry, Group};

/// Default timeout; a live server on localhost answers well within it
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the session client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, e.g. `http://localhost:6275`
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a client config for `address` (`host:port`)
    pub fn new(address: &str) -> Self {
        Self {
            base_url: format!("http://{address}"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Session Client
// ============================================================================

/// Client for the server's HTTP API
pub struct SessionClient {
    config: ClientConfig,
    http_client: Client,
}

impl SessionClient {
    /// Create a new session client
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Fetch all groups
    pub async fn groups(&self) -> Result<Vec<Group>, ClientError> {
        let url = format!("{}/_/api/groups", self.config.base_url);
        self.get(&url).await
    }

    /// Add an absolute path to `group`
    pub async fn add_file(&self, path: &Path, group: &str) -> Result<FileEntry, ClientError> {
        let request = AddFileRequest {
            path: path.to_string_lossy().into_owned(),
            group: group.to_string(),
        };

        let url = format!("{}/_/api/files", self.config.base_url);
        self.post(&url, &request).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, ClientError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Self::read(response).await
    }

    async fn post<T: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<R, ClientError> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Self::read(response).await
    }

    async fn read<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

// ============================================================================
// Client Errors
// ============================================================================

/// Client errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Initialization error: {0}")]
    Init(String),

    /// Connection refused, timed out, or otherwise unreachable
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

// ============================================================================
// Tests
// ============================================================================
