//! # Registry Events
//!
//! Notification types that flow through the bus. One notification is
//! emitted per successfully applied registry operation; rejected operations
//! emit nothing.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, FileId};

/// A fact describing one committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A new record was registered.
    Registered {
        /// The assigned id.
        id: FileId,
        /// Opaque content locator supplied by the owner.
        reference: String,
        /// The registering identity.
        owner: Address,
    },

    /// The owner granted access to another identity.
    AccessGranted {
        /// Target record.
        id: FileId,
        /// Identity receiving access.
        grantee: Address,
    },

    /// The owner revoked access from an identity.
    AccessRevoked {
        /// Target record.
        id: FileId,
        /// Identity losing access.
        grantee: Address,
    },

    /// The record was permanently retired.
    Deleted {
        /// Retired id.
        id: FileId,
    },
}

impl RegistryEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Registered { .. } => EventTopic::Registration,
            Self::AccessGranted { .. } | Self::AccessRevoked { .. } => EventTopic::Access,
            Self::Deleted { .. } => EventTopic::Deletion,
        }
    }

    /// The record this event refers to.
    #[must_use]
    pub fn file_id(&self) -> FileId {
        match self {
            Self::Registered { id, .. }
            | Self::AccessGranted { id, .. }
            | Self::AccessRevoked { id, .. }
            | Self::Deleted { id } => *id,
        }
    }

    /// Short operation label, used for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "register",
            Self::AccessGranted { .. } => "grant_access",
            Self::AccessRevoked { .. } => "revoke_access",
            Self::Deleted { .. } => "delete_record",
        }
    }
}

/// A notification with its position in the log.
///
/// Sequences start at 1 and are contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log.
    pub sequence: u64,
    /// The notification.
    pub event: RegistryEvent,
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// `Registered` events.
    Registration,
    /// `AccessGranted` and `AccessRevoked` events.
    Access,
    /// `Deleted` events.
    Deletion,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Records to include. Empty means all records.
    pub file_ids: Vec<FileId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            file_ids: Vec::new(),
        }
    }

    /// Create a filter for events about specific records.
    #[must_use]
    pub fn for_files(file_ids: Vec<FileId>) -> Self {
        Self {
            topics: Vec::new(),
            file_ids,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RegistryEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let file_match = self.file_ids.is_empty() || self.file_ids.contains(&event.file_id());

        topic_match && file_match
    }
}
