//! # Domain Entities
//!
//! Records, access entries and the commands that mutate them.

use super::value_objects::ContentReference;
use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, FileId};

/// A registered file record.
///
/// `owner` is fixed at registration. `exists` goes from true to false on
/// deletion and never back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Engine-assigned id.
    pub id: FileId,
    /// Opaque content locator.
    pub reference: String,
    /// Registering identity.
    pub owner: Address,
    /// False once deleted.
    pub exists: bool,
}

/// Presence of this pair means `grantee` may act on record `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessEntry {
    /// Record the entry belongs to.
    pub id: FileId,
    /// Identity holding access.
    pub grantee: Address,
}

/// A mutating request, evaluated against the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a record owned by the caller.
    Register { reference: ContentReference },
    /// Give `grantee` access to `id`.
    GrantAccess { id: FileId, grantee: Address },
    /// Take access to `id` away from `grantee`.
    RevokeAccess { id: FileId, grantee: Address },
    /// Retire `id` permanently.
    DeleteRecord { id: FileId },
}

impl Command {
    /// Operation label for logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::GrantAccess { .. } => "grant_access",
            Self::RevokeAccess { .. } => "revoke_access",
            Self::DeleteRecord { .. } => "delete_record",
        }
    }
}

/// Aggregate counters over the registry state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Ids ever assigned, including deleted ones.
    pub total_registered: u64,
    /// Records not yet deleted.
    pub active_records: u64,
    /// Access entries across all live records.
    pub active_grants: u64,
}
