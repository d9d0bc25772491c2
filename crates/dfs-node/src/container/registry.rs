//! # Registry Container
//!
//! Builds the registry's components in dependency order:
//!
//! ```text
//! NodeConfig ──▶ InMemoryEventBus ──┐
//!            └─▶ NodeJournal ───────┴─▶ FileRegistryService ──▶ RegistryRequestHandler
//! ```
//!
//! The bus is created empty on every start so journal replay rebuilds the
//! notification log with the same sequence numbers it had before.

use std::sync::Arc;

use dfs_file_registry::prelude::{
    FileRegistryService, JournalError, RegistryError, RegistryRequestHandler, ServiceConfig,
};
use shared_bus::InMemoryEventBus;
use thiserror::Error;
use tracing::{info, instrument};

use crate::adapters::NodeJournal;
use crate::container::config::{ConfigError, NodeConfig};

/// Concrete registry service hosted by the node.
pub type NodeService = FileRegistryService<NodeJournal, InMemoryEventBus>;

/// Errors raised while assembling the node.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The journal could not be opened.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// The registry could not be rebuilt from the journal.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Central container holding the node's shared components.
pub struct RegistryContainer {
    /// Notification bus.
    pub bus: Arc<InMemoryEventBus>,
    /// Registry engine.
    pub service: Arc<NodeService>,
    /// Request handler in front of the engine.
    pub handler: RegistryRequestHandler<NodeService>,
    /// Whether the journal is persisted.
    pub durable: bool,
}

impl RegistryContainer {
    /// Build every component from `config`.
    ///
    /// # Errors
    ///
    /// See [`ContainerError`].
    #[instrument(skip_all, fields(journal = ?config.journal_path))]
    pub fn new(config: &NodeConfig) -> Result<Self, ContainerError> {
        config.validate()?;

        let bus = Arc::new(InMemoryEventBus::with_capacity(config.channel_capacity));
        let journal = NodeJournal::open(config.journal_path.as_deref())?;
        let durable = journal.is_durable();

        let service = Arc::new(FileRegistryService::open(
            journal,
            Arc::clone(&bus),
            ServiceConfig {
                check_invariants: config.check_invariants,
            },
        )?);
        let handler = RegistryRequestHandler::new(Arc::clone(&service));

        info!(
            durable,
            capacity = bus.capacity(),
            replayed = bus.len(),
            "Registry container ready"
        );

        Ok(Self {
            bus,
            service,
            handler,
            durable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_container() {
        let container = RegistryContainer::new(&NodeConfig::default()).unwrap();
        assert!(!container.durable);
        assert!(container.bus.is_empty());
        assert_eq!(container.bus.capacity(), 1000);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = NodeConfig {
            channel_capacity: 0,
            ..NodeConfig::default()
        };
        assert!(matches!(
            RegistryContainer::new(&config),
            Err(ContainerError::Config(ConfigError::ZeroChannelCapacity))
        ));
    }

    #[test]
    fn test_second_container_on_same_journal_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            journal_path: Some(dir.path().join("registry.jsonl")),
            ..NodeConfig::default()
        };

        let first = RegistryContainer::new(&config).unwrap();
        assert!(first.durable);
        assert!(matches!(
            RegistryContainer::new(&config),
            Err(ContainerError::Journal(JournalError::Locked(_)))
        ));
    }
}
