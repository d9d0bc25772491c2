//! # In-Memory Journal
//!
//! Volatile journal used when no journal path is configured, and in tests.

use crate::domain::errors::JournalError;
use crate::ports::outbound::EventJournal;
use shared_bus::RegistryEvent;

/// Journal that keeps events in a `Vec`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryJournal {
    events: Vec<RegistryEvent>,
}

impl InMemoryJournal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal pre-populated with `events`, as if they had been
    /// appended earlier.
    #[must_use]
    pub fn with_events(events: Vec<RegistryEvent>) -> Self {
        Self { events }
    }

    /// Borrow the stored events.
    #[must_use]
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }
}

impl EventJournal for InMemoryJournal {
    fn load(&self) -> Result<Vec<RegistryEvent>, JournalError> {
        Ok(self.events.clone())
    }

    fn append(&mut self, event: &RegistryEvent) -> Result<(), JournalError> {
        self.events.push(event.clone());
        Ok(())
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}
