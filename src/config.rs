//! Configuration module for roomrelay.

use serde::Deserialize;
use std::path::Path;

use crate::{RelayError, Result};

/// Environment variable overriding `server.port`.
pub const PORT_ENV_VAR: &str = "ROOMRELAY_PORT";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path of the WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// CORS allowed origins (empty = any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            cors_origins: vec![],
        }
    }
}

/// Relay behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Capacity of each session's outbound queue.
    ///
    /// A session whose queue is full when a broadcast arrives is disconnected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Capacity of the hub command channel.
    #[serde(default = "default_hub_capacity")]
    pub hub_capacity: usize,
    /// Room used when the client does not name one.
    #[serde(default = "default_room")]
    pub default_room: String,
    /// Honour the `room` query parameter. When false every session joins
    /// `default_room`.
    #[serde(default = "default_multi_room")]
    pub multi_room: bool,
    /// Deliver a sender's own messages back to it.
    #[serde(default = "default_loopback")]
    pub loopback: bool,
    /// Maximum size of a single inbound WebSocket message in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

fn default_queue_capacity() -> usize {
    256
}

fn default_hub_capacity() -> usize {
    1024
}

fn default_room() -> String {
    "general".to_string()
}

fn default_multi_room() -> bool {
    true
}

fn default_loopback() -> bool {
    true
}

fn default_max_message_bytes() -> usize {
    64 * 1024
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            hub_capacity: default_hub_capacity(),
            default_room: default_room(),
            multi_room: default_multi_room(),
            loopback: default_loopback(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file output.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/roomrelay.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Relay configuration.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RelayError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    fn load_with<P, F>(path: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load(path)?;
        config.apply_overrides(lookup);
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RelayError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `ROOMRELAY_PORT`: Override the listening port
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV_VAR) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => {
                    tracing::warn!("Ignoring {}={:?}: not a valid port", PORT_ENV_VAR, port);
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.relay.queue_capacity == 0 {
            return Err(RelayError::Validation(
                "relay.queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.relay.hub_capacity == 0 {
            return Err(RelayError::Validation(
                "relay.hub_capacity must be greater than zero".to_string(),
            ));
        }
        if self.relay.default_room.trim().is_empty() {
            return Err(RelayError::Validation(
                "relay.default_room must not be empty".to_string(),
            ));
        }
        if !self.server.ws_path.starts_with('/') {
            return Err(RelayError::Validation(format!(
                "server.ws_path must start with '/', got {:?}",
                self.server.ws_path
            )));
        }
        Ok(())
    }
}
