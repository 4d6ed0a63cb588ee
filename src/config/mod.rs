//! Configuration management for mo
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `MO_*` environment variables. Command-line flags are applied last by the
//! binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::server::ServerConfig;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "MO_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Viewer server configuration
    pub server: ServerConfig,

    /// Join-or-start configuration
    pub join: JoinConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Join-or-start configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// How long to wait for a running server to answer, in milliseconds
    pub probe_timeout_ms: u64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then `path` (or `MO_CONFIG`), then the
    /// environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV).ok();
        let path = path.or(from_env.as_deref().map(Path::new));

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Override values from `MO_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(host) = env_var("MO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("MO_PORT")? {
            self.server.port = port;
        }
        if let Some(secs) = env_parse("MO_SHUTDOWN_GRACE_SECS")? {
            self.server.shutdown_grace_secs = secs;
        }
        if let Some(ms) = env_parse("MO_PROBE_TIMEOUT_MS")? {
            self.join.probe_timeout_ms = ms;
        }
        if let Some(level) = env_var("MO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = env_var("MO_LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;

        if self.server.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.join.probe_timeout_ms == 0 {
            anyhow::bail!("probe_timeout_ms must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "unknown log format '{}' (expected text or json)",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Get join probe timeout as Duration
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.join.probe_timeout_ms)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {v}"))
        })
        .transpose()
}
