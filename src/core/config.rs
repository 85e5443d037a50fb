//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (optionally via a `.env` file) or defaults.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use crate::domains::npm::registry::{DEFAULT_REGISTRY_URL, DEFAULT_REQUEST_TIMEOUT};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// npm registry access.
    pub npm: NpmConfig,

    /// Problems found while reading the environment. Loading runs before the
    /// log subscriber exists, so these are reported by the caller afterwards.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Configuration for npm registry access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpmConfig {
    /// Base URL of the npm-compatible registry.
    pub registry_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Optional budget for a whole dependency tree expansion, in seconds.
    /// Nodes still pending when it runs out are reported as errors.
    pub tree_timeout_secs: Option<u64>,
}

impl NpmConfig {
    /// The tree expansion budget, if one is configured.
    pub fn tree_timeout(&self) -> Option<Duration> {
        self.tree_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            tree_timeout_secs: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "mcp-devtools".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            npm: NpmConfig::default(),
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`, `MCP_NPM_REGISTRY_URL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(timestamps) = std::env::var("MCP_LOG_TIMESTAMPS") {
            config.logging.with_timestamps = timestamps.to_lowercase() != "false" && timestamps != "0";
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        // npm registry
        if let Ok(url) = std::env::var("MCP_NPM_REGISTRY_URL") {
            config.npm.registry_url = url;
        }

        if let Ok(timeout) = std::env::var("MCP_NPM_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => config.npm.request_timeout_secs = secs,
                _ => config.warnings.push(format!(
                    "Ignoring invalid MCP_NPM_TIMEOUT_SECS={:?}, using {}s",
                    timeout, config.npm.request_timeout_secs
                )),
            }
        }

        if let Ok(timeout) = std::env::var("MCP_NPM_TREE_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => config.npm.tree_timeout_secs = Some(secs),
                _ => config.warnings.push(format!(
                    "Ignoring invalid MCP_NPM_TREE_TIMEOUT_SECS={:?}, tree expansion is unbounded",
                    timeout
                )),
            }
        }

        config
    }

    /// Check values that cannot be corrected silently.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.npm.registry_url).map_err(|e| {
            Error::config(format!(
                "invalid npm registry URL '{}': {}",
                self.npm.registry_url, e
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "npm registry URL cannot be a base: {}",
                self.npm.registry_url
            )));
        }
        if self.npm.request_timeout_secs == 0 {
            return Err(Error::config("npm request timeout must be positive"));
        }
        Ok(())
    }
}

// Serializes tests that mutate process environment variables.
#[cfg(test)]
pub(crate) static ENV_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
