//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the registry service needs from the outside world.

use crate::domain::errors::JournalError;
use shared_bus::RegistryEvent;

/// Durable, append-only record of committed events.
///
/// The service calls `append` inside its commit, before mutating state, so a
/// failed append rejects the operation with nothing changed. Calls are made
/// while the service lock is held and are never concurrent.
pub trait EventJournal: Send + Sync {
    /// Read back every event in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or decoded.
    fn load(&self) -> Result<Vec<RegistryEvent>, JournalError>;

    /// Persist one event. Must be durable when it returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event was not persisted.
    fn append(&mut self, event: &RegistryEvent) -> Result<(), JournalError>;

    /// Number of events persisted.
    fn len(&self) -> usize;

    /// True if nothing has been persisted.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
