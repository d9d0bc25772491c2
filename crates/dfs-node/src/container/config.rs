//! # Node Configuration
//!
//! Runtime parameters for the registry node, read from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DFS_JOURNAL_PATH` | unset | Journal file; unset keeps the journal in memory |
//! | `DFS_CHANNEL_CAPACITY` | `1000` | Live notification channel capacity |
//! | `DFS_CHECK_INVARIANTS` | `false` | Verify invariants after every commit |

use std::env;
use std::path::PathBuf;

use dfs_telemetry::TelemetryConfig;
use thiserror::Error;

/// Default capacity of the live notification channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = shared_bus::DEFAULT_CHANNEL_CAPACITY;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Journal file. `None` selects the in-memory journal.
    pub journal_path: Option<PathBuf>,
    /// Live notification channel capacity.
    pub channel_capacity: usize,
    /// Verify domain invariants after each commit.
    pub check_invariants: bool,
    /// Logging and metrics configuration.
    pub telemetry: TelemetryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            journal_path: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            check_invariants: false,
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// The notification channel must hold at least one event.
    #[error("channel capacity must be greater than zero")]
    ZeroChannelCapacity,
}

impl NodeConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`NodeConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` for an unparsable value, or any error
    /// from [`NodeConfig::validate`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            telemetry: TelemetryConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(path) = lookup("DFS_JOURNAL_PATH").filter(|p| !p.trim().is_empty()) {
            config.journal_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("DFS_CHANNEL_CAPACITY") {
            config.channel_capacity =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "DFS_CHANNEL_CAPACITY",
                        value: raw.clone(),
                    })?;
        }

        if let Some(raw) = lookup("DFS_CHECK_INVARIANTS") {
            config.check_invariants = parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: "DFS_CHECK_INVARIANTS",
                value: raw,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the runtime cannot start with.
    ///
    /// # Errors
    ///
    /// `ConfigError::ZeroChannelCapacity` if `channel_capacity` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
