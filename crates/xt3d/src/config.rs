//! Authority configuration.
//!
//! Defaults cover a local game on port 10001. A TOML file can override
//! any subset of fields; `XT3_LISTEN` and the `--listen` flag override
//! the listen address on top of that.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:10001";

/// Environment variable overriding the listen address.
pub const LISTEN_ENV: &str = "XT3_LISTEN";

/// Configuration for the game authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorityConfig {
    /// Address the TCP listener binds to.
    pub listen: SocketAddr,

    /// Idle time after which a silent connection is dropped (seconds).
    pub read_timeout_secs: u64,

    /// Maximum time a single outbound write may take (seconds).
    pub write_timeout_secs: u64,

    /// Capacity of each participant's outbound queue.
    pub queue_depth: usize,

    /// Maximum number of simultaneous connections.
    pub max_connections: usize,

    /// How often closed participant queues are pruned (seconds).
    pub prune_interval_secs: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 10001)),
            read_timeout_secs: 300,
            write_timeout_secs: 10,
            queue_depth: 64,
            max_connections: 8,
            prune_interval_secs: 5,
        }
    }
}

impl AuthorityConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Missing fields take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading config from file");

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), listen = %config.listen, "Config loaded");
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides the listen address from a string like "0.0.0.0:10001".
    pub fn with_listen(mut self, listen: &str) -> Result<Self, ConfigError> {
        self.listen = listen
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(listen.to_string()))?;
        Ok(self)
    }

    /// Applies `XT3_LISTEN` if it is set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        match std::env::var(LISTEN_ENV) {
            Ok(listen) => self.with_listen(&listen),
            Err(_) => Ok(self),
        }
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("read_timeout_secs", self.read_timeout_secs),
            ("write_timeout_secs", self.write_timeout_secs),
            ("prune_interval_secs", self.prune_interval_secs),
            ("queue_depth", self.queue_depth as u64),
            ("max_connections", self.max_connections as u64),
        ];

        match positive.iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::Invalid {
                field: *field,
                reason: "must be greater than zero",
            }),
            None => Ok(()),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Read { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
