//! Server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::events::DEFAULT_SINK_CAPACITY;

/// Default listening port
pub const DEFAULT_PORT: u16 = 6275;

/// Default host; the viewer is a localhost-only tool
pub const DEFAULT_HOST: &str = "localhost";

/// Configuration for the viewer server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind and advertise
    pub host: String,

    /// Port to bind; 0 picks an ephemeral port
    pub port: u16,

    /// Grace period for in-flight requests at shutdown, in seconds
    pub shutdown_grace_secs: u64,

    /// Queue capacity of each live-reload sink
    pub sink_capacity: usize,

    /// Interval between keep-alive comments on live-reload streams, in seconds
    pub keep_alive_secs: u64,

    /// Watch tracked files for changes
    pub watch_files: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            shutdown_grace_secs: 5,
            sink_capacity: DEFAULT_SINK_CAPACITY,
            keep_alive_secs: 15,
            watch_files: true,
            enable_request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// `host:port` as used in URLs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Shutdown grace period
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Keep-alive interval for live-reload streams
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "host".to_string(),
                reason: "Host must not be empty".to_string(),
            });
        }

        if self.sink_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sink_capacity".to_string(),
                reason: "Sinks must hold at least 1 event".to_string(),
            });
        }

        if self.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "keep_alive_secs".to_string(),
                reason: "Keep-alive interval must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    shutdown_grace_secs: Option<u64>,
    sink_capacity: Option<usize>,
    keep_alive_secs: Option<u64>,
    watch_files: Option<bool>,
    enable_request_logging: Option<bool>,
}

impl ServerConfigBuilder {
    /// Set host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set shutdown grace period
    pub fn shutdown_grace_secs(mut self, secs: u64) -> Self {
        self.shutdown_grace_secs = Some(secs);
        self
    }

    /// Set sink capacity
    pub fn sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = Some(capacity);
        self
    }

    /// Set keep-alive interval
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive_secs = Some(secs);
        self
    }

    /// Enable/disable file watching
    pub fn watch_files(mut self, enable: bool) -> Self {
        self.watch_files = Some(enable);
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let defaults = ServerConfig::default();
        let config = ServerConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            shutdown_grace_secs: self.shutdown_grace_secs.unwrap_or(defaults.shutdown_grace_secs),
            sink_capacity: self.sink_capacity.unwrap_or(defaults.sink_capacity),
            keep_alive_secs: self.keep_alive_secs.unwrap_or(defaults.keep_alive_secs),
            watch_files: self.watch_files.unwrap_or(defaults.watch_files),
            enable_request_logging: self
                .enable_request_logging
                .unwrap_or(defaults.enable_request_logging),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
