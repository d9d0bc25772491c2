//! # Inbound Ports (Driving Ports)
//!
//! API exposed by the registry to callers. Every method takes the caller
//! identity as already verified by whatever sits in front of the engine.

use crate::domain::entities::{FileRecord, RegistryStats};
use crate::domain::errors::RegistryError;
use async_trait::async_trait;
use shared_bus::EventRecord;
use shared_types::entities::{Address, FileId};

/// Acknowledgment of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// The record the operation acted on (the new id for registrations).
    pub id: FileId,
    /// The notification emitted by the commit.
    pub notification: EventRecord,
}

/// File registry API.
#[async_trait]
pub trait FileRegistryApi: Send + Sync {
    /// Register a new record owned by `caller`.
    async fn register(&self, caller: Address, reference: String) -> Result<CommitReceipt, RegistryError>;

    /// Grant `grantee` access to record `id`. Owner only.
    async fn grant_access(
        &self,
        caller: Address,
        id: FileId,
        grantee: Address,
    ) -> Result<CommitReceipt, RegistryError>;

    /// Revoke `grantee`'s access to record `id`. Owner only.
    async fn revoke_access(
        &self,
        caller: Address,
        id: FileId,
        grantee: Address,
    ) -> Result<CommitReceipt, RegistryError>;

    /// Permanently delete record `id`. Owner only.
    async fn delete_record(&self, caller: Address, id: FileId) -> Result<CommitReceipt, RegistryError>;

    /// Look up a live record.
    async fn get_record(&self, id: FileId) -> Result<FileRecord, RegistryError>;

    /// Owner or grantee check.
    async fn has_access(&self, id: FileId, identity: Address) -> Result<bool, RegistryError>;

    /// Grantees of a live record.
    async fn list_grantees(&self, id: FileId) -> Result<Vec<Address>, RegistryError>;

    /// Live records owned by `owner`.
    async fn records_owned_by(&self, owner: Address) -> Vec<FileRecord>;

    /// Live records shared with `grantee`.
    async fn records_shared_with(&self, grantee: Address) -> Vec<FileRecord>;

    /// All live records.
    async fn active_records(&self) -> Vec<FileRecord>;

    /// Aggregate counters.
    async fn registry_stats(&self) -> RegistryStats;
}
