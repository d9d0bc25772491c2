//! # Registry State Machine
//!
//! Pure, synchronous core of the registry. A command is first *evaluated*
//! against the current state, which either rejects it or yields the event it
//! would produce; the event is then *applied*. Keeping the two apart lets the
//! service persist the event between the decision and the mutation, and lets
//! journal replay reuse `apply` unchanged.
//!
//! Precondition order for every command:
//! 1. structural validation (`InvalidInput`)
//! 2. existence (`NotFound`)
//! 3. ownership (`Unauthorized`)

use super::entities::{AccessEntry, Command, FileRecord, RegistryStats};
use super::errors::{JournalError, RegistryError};
use super::value_objects::{require_file_id, require_identity};
use shared_bus::RegistryEvent;
use shared_types::entities::{Address, FileId};
use std::collections::{BTreeMap, BTreeSet};

/// Complete registry state: every record ever registered plus the access
/// entries of the live ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryState {
    records: BTreeMap<FileId, FileRecord>,
    grants: BTreeMap<FileId, BTreeSet<Address>>,
    next_id: FileId,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryState {
    /// Empty registry; the first registration receives [`FileId::FIRST`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            grants: BTreeMap::new(),
            next_id: FileId::FIRST,
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Decide the outcome of `command` issued by `caller`.
    ///
    /// Does not mutate. On success returns the event that [`apply`] will
    /// commit.
    ///
    /// [`apply`]: Self::apply
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `NotFound` or `Unauthorized`, checked in that order.
    pub fn evaluate(&self, caller: Address, command: &Command) -> Result<RegistryEvent, RegistryError> {
        require_identity(caller, "caller")?;

        match command {
            Command::Register { reference } => Ok(RegistryEvent::Registered {
                id: self.next_id,
                reference: reference.as_str().to_owned(),
                owner: caller,
            }),
            Command::GrantAccess { id, grantee } => {
                let id = require_file_id(*id)?;
                let grantee = require_identity(*grantee, "grantee")?;
                self.require_owner(caller, id)?;
                Ok(RegistryEvent::AccessGranted { id, grantee })
            }
            Command::RevokeAccess { id, grantee } => {
                let id = require_file_id(*id)?;
                let grantee = require_identity(*grantee, "grantee")?;
                self.require_owner(caller, id)?;
                Ok(RegistryEvent::AccessRevoked { id, grantee })
            }
            Command::DeleteRecord { id } => {
                let id = require_file_id(*id)?;
                self.require_owner(caller, id)?;
                Ok(RegistryEvent::Deleted { id })
            }
        }
    }

    /// Commit an event.
    ///
    /// Every event produced by [`evaluate`](Self::evaluate) on this state
    /// applies cleanly. Events read back from a journal are checked for
    /// consistency and refused without mutating if they do not follow.
    ///
    /// # Errors
    ///
    /// `JournalError::Inconsistent` (with index 0; callers replaying a
    /// journal fill in the position).
    pub fn apply(&mut self, event: &RegistryEvent) -> Result<(), JournalError> {
        match event {
            RegistryEvent::Registered { id, reference, owner } => {
                if *id != self.next_id {
                    return Err(inconsistent(format!(
                        "registration of id {id} but next id is {}",
                        self.next_id
                    )));
                }
                if owner.is_zero() || reference.trim().is_empty() {
                    return Err(inconsistent(format!("malformed registration of id {id}")));
                }
                self.records.insert(
                    *id,
                    FileRecord {
                        id: *id,
                        reference: reference.clone(),
                        owner: *owner,
                        exists: true,
                    },
                );
                self.next_id = id.next();
            }
            RegistryEvent::AccessGranted { id, grantee } => {
                let owner = self.live_owner(*id)?;
                // The owner's access is implicit; no entry is stored for it.
                if *grantee != owner {
                    self.grants.entry(*id).or_default().insert(*grantee);
                }
            }
            RegistryEvent::AccessRevoked { id, grantee } => {
                self.live_owner(*id)?;
                if let Some(grantees) = self.grants.get_mut(id) {
                    grantees.remove(grantee);
                    if grantees.is_empty() {
                        self.grants.remove(id);
                    }
                }
            }
            RegistryEvent::Deleted { id } => {
                self.live_owner(*id)?;
                if let Some(record) = self.records.get_mut(id) {
                    record.exists = false;
                }
                self.grants.remove(id);
            }
        }
        Ok(())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Look up a live record.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for id 0, `NotFound` for unknown or deleted ids.
    pub fn get_record(&self, id: FileId) -> Result<&FileRecord, RegistryError> {
        let id = require_file_id(id)?;
        self.records
            .get(&id)
            .filter(|record| record.exists)
            .ok_or(RegistryError::NotFound { id })
    }

    /// True if `identity` is the owner of, or has been granted, record `id`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for id 0 or the zero address, `NotFound` for dead ids.
    pub fn has_access(&self, id: FileId, identity: Address) -> Result<bool, RegistryError> {
        let id = require_file_id(id)?;
        let identity = require_identity(identity, "identity")?;
        let record = self.get_record(id)?;
        Ok(record.owner == identity
            || self
                .grants
                .get(&id)
                .is_some_and(|grantees| grantees.contains(&identity)))
    }

    /// Identities holding an access entry on `id`, in address order.
    ///
    /// # Errors
    ///
    /// As for [`get_record`](Self::get_record).
    pub fn list_grantees(&self, id: FileId) -> Result<Vec<Address>, RegistryError> {
        self.get_record(id)?;
        Ok(self
            .grants
            .get(&id)
            .map(|grantees| grantees.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Live records owned by `owner`, in id order.
    #[must_use]
    pub fn records_owned_by(&self, owner: Address) -> Vec<FileRecord> {
        self.live_records()
            .filter(|record| record.owner == owner)
            .cloned()
            .collect()
    }

    /// Live records on which `grantee` holds an access entry, in id order.
    #[must_use]
    pub fn records_shared_with(&self, grantee: Address) -> Vec<FileRecord> {
        self.live_records()
            .filter(|record| {
                self.grants
                    .get(&record.id)
                    .is_some_and(|grantees| grantees.contains(&grantee))
            })
            .cloned()
            .collect()
    }

    /// All live records, in id order.
    #[must_use]
    pub fn active_records(&self) -> Vec<FileRecord> {
        self.live_records().cloned().collect()
    }

    /// Number of live records.
    #[must_use]
    pub fn active_record_count(&self) -> usize {
        self.live_records().count()
    }

    /// Number of ids ever assigned.
    #[must_use]
    pub fn total_registered(&self) -> u64 {
        self.next_id.get() - FileId::FIRST.get()
    }

    /// Number of access entries.
    #[must_use]
    pub fn active_grant_count(&self) -> usize {
        self.grants.values().map(BTreeSet::len).sum()
    }

    /// The id the next registration will receive.
    #[must_use]
    pub fn next_id(&self) -> FileId {
        self.next_id
    }

    /// Aggregate counters.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_registered: self.total_registered(),
            active_records: self.active_record_count() as u64,
            active_grants: self.active_grant_count() as u64,
        }
    }

    /// Every record, including deleted ones, in id order.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Every access entry, ordered by id then grantee.
    pub fn access_entries(&self) -> impl Iterator<Item = AccessEntry> + '_ {
        self.grants.iter().flat_map(|(id, grantees)| {
            grantees.iter().map(move |grantee| AccessEntry {
                id: *id,
                grantee: *grantee,
            })
        })
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn live_records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values().filter(|record| record.exists)
    }

    fn require_owner(&self, caller: Address, id: FileId) -> Result<(), RegistryError> {
        let record = self.get_record(id)?;
        if record.owner != caller {
            return Err(RegistryError::Unauthorized { caller, id });
        }
        Ok(())
    }

    fn live_owner(&self, id: FileId) -> Result<Address, JournalError> {
        self.records
            .get(&id)
            .filter(|record| record.exists)
            .map(|record| record.owner)
            .ok_or_else(|| inconsistent(format!("event targets missing or deleted id {id}")))
    }
}

fn inconsistent(reason: String) -> JournalError {
    JournalError::Inconsistent { index: 0, reason }
}
