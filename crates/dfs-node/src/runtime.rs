//! # Node Runtime
//!
//! Owns the registry container and the background monitor.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Open the journal and replay it into a fresh bus
//! 3. Spawn the notification monitor
//! 4. Serve requests until input ends or a shutdown signal arrives

use std::path::Path;
use std::sync::Arc;

use dfs_telemetry::{log_event, write_metrics, TelemetryError};
use shared_bus::InMemoryEventBus;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::container::{ContainerError, NodeConfig, NodeService, RegistryContainer};
use crate::handlers::NotificationMonitor;
use crate::session::{Session, SessionError, SessionSummary};

/// The registry node.
pub struct NodeRuntime {
    /// Configuration the node was started with.
    config: NodeConfig,
    /// Shared components.
    container: RegistryContainer,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Build the node, replaying the configured journal.
    ///
    /// # Errors
    ///
    /// See [`ContainerError`].
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        info!("Creating DFS registry node runtime");

        let container = RegistryContainer::new(&config)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            container,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Spawn the notification monitor. Its handle resolves to the number of
    /// notifications observed once shutdown is signalled.
    pub fn start(&self) -> JoinHandle<u64> {
        let monitor = NotificationMonitor::new(
            self.container.bus.as_ref(),
            Arc::clone(&self.container.service),
        );
        let shutdown = self.shutdown_rx.clone();

        log_event!(
            info,
            "runtime",
            "Registry node started",
            durable = self.container.durable,
            check_invariants = self.config.check_invariants
        );

        tokio::spawn(monitor.run(shutdown))
    }

    /// Serve one JSON-lines stream.
    ///
    /// # Errors
    ///
    /// See [`SessionError`].
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<SessionSummary, SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        Session::new(self.container.handler.clone())
            .run(reader, writer)
            .await
    }

    /// Signal background handlers to stop.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }

    /// Write the metrics textfile if `DFS_METRICS_PATH` is configured.
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// See [`TelemetryError`].
    pub fn export_metrics(&self) -> Result<Option<&Path>, TelemetryError> {
        let Some(path) = self.config.telemetry.metrics_path.as_deref() else {
            return Ok(None);
        };
        write_metrics(path)?;
        log_event!(info, "runtime", "Metrics exported", path = %path.display());
        Ok(Some(path))
    }

    /// Configuration the node was started with.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Registry engine.
    pub fn service(&self) -> &Arc<NodeService> {
        &self.container.service
    }

    /// Notification bus.
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.container.bus
    }
}
