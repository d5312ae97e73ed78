//! Configuration structures.
//!
//! Configuration is assembled once (defaults, a JSON file, or explicit values)
//! and then frozen into an immutable [`crate::mediator::Endpoint`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::errors::Result;

/// Global client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// Node endpoint configuration.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Polling defaults.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Load configuration from a JSON file. Missing sections take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// A single default header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Node endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the node (scheme, host, port, optional path prefix).
    pub base_url: String,

    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Headers sent with every request, in order.
    pub default_headers: Vec<HeaderEntry>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8734".to_string(),
            timeout: Duration::from_secs(30),
            default_headers: Vec::new(),
        }
    }
}

/// Polling defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval between live-state samples while polling.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Attempts made by `wait_for` before giving up.
    pub wait_attempts: u32,

    /// Sleep between `wait_for` attempts.
    #[serde(with = "humantime_serde")]
    pub wait_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            wait_attempts: 10,
            wait_interval: Duration::from_secs(1),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
