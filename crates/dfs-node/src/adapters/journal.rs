//! # Node Journal
//!
//! The registry service is generic over its journal. The node picks the
//! backend at startup, so it wraps both in one enum.

use std::path::Path;

use dfs_file_registry::prelude::{EventJournal, FileJournal, InMemoryJournal, JournalError};
use shared_bus::RegistryEvent;
use tracing::info;

/// Journal backend selected from configuration.
#[derive(Debug)]
pub enum NodeJournal {
    /// Events are kept only for the lifetime of the process.
    Memory(InMemoryJournal),
    /// Events are persisted to a locked JSON-lines file.
    File(FileJournal),
}

impl NodeJournal {
    /// Open the file journal at `path`, or an in-memory journal for `None`.
    ///
    /// # Errors
    ///
    /// Any error from [`FileJournal::open`].
    pub fn open(path: Option<&Path>) -> Result<Self, JournalError> {
        match path {
            Some(path) => Ok(Self::File(FileJournal::open(path)?)),
            None => {
                info!("No journal path configured, registry state will not survive restarts");
                Ok(Self::Memory(InMemoryJournal::new()))
            }
        }
    }

    /// True if committed events survive a restart.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl EventJournal for NodeJournal {
    fn load(&self) -> Result<Vec<RegistryEvent>, JournalError> {
        match self {
            Self::Memory(journal) => journal.load(),
            Self::File(journal) => journal.load(),
        }
    }

    fn append(&mut self, event: &RegistryEvent) -> Result<(), JournalError> {
        match self {
            Self::Memory(journal) => journal.append(event),
            Self::File(journal) => journal.append(event),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Memory(journal) => journal.len(),
            Self::File(journal) => journal.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::FileId;

    #[test]
    fn test_memory_when_no_path() {
        let journal = NodeJournal::open(None).unwrap();
        assert!(!journal.is_durable());
        assert!(journal.is_empty());
    }

    #[test]
    fn test_file_journal_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let mut journal = NodeJournal::open(Some(&path)).unwrap();
        assert!(journal.is_durable());
        journal
            .append(&RegistryEvent::Deleted { id: FileId(1) })
            .unwrap();

        assert_eq!(journal.len(), 1);
        assert_eq!(journal.load().unwrap().len(), 1);
    }
}
