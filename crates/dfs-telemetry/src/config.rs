//! Telemetry configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Default service name reported in logs.
pub const DEFAULT_SERVICE_NAME: &str = "dfs-registry";

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or an `EnvFilter` directive)
    pub log_level: String,

    /// Whether to emit log output at all
    pub console_output: bool,

    /// Whether to format logs as JSON
    pub json_logs: bool,

    /// Network identifier (devnet, testnet, mainnet)
    pub network: String,

    /// Prometheus textfile written at shutdown, if set
    pub metrics_path: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "devnet".to_string(),
            metrics_path: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DFS_SERVICE_NAME`: Service name (default: dfs-registry)
    /// - `DFS_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `DFS_CONSOLE_OUTPUT`: Enable log output (default: true)
    /// - `DFS_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `DFS_NETWORK`: Network name (default: devnet)
    /// - `DFS_METRICS_PATH`: Prometheus textfile written at shutdown (default: unset)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("DFS_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),

            log_level: lookup("DFS_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            console_output: lookup("DFS_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: lookup("DFS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            network: lookup("DFS_NETWORK").unwrap_or_else(|| "devnet".to_string()),

            metrics_path: lookup("DFS_METRICS_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}
