//! # Domain Invariants
//!
//! Properties of [`RegistryState`] that must hold after every commit. The
//! service can verify them after each operation when
//! `ServiceConfig::check_invariants` is set.
//!
//! - Sequential ids: records exist for exactly `1..next_id`.
//! - Owner immutability: no commit changes a record's owner.
//! - Live grants: access entries only exist on live records.
//! - No owner entries: an owner never appears in its own access list.
//! - Deletion finality: a deleted record never comes back.

use super::state::RegistryState;
use shared_types::entities::{Address, FileId};

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Every id in `1..next_id` has a record and no other id does.
#[must_use]
pub fn check_sequential_ids(state: &RegistryState) -> bool {
    let expected = FileId::FIRST.get()..state.next_id().get();
    state.records().map(|record| record.id.get()).eq(expected)
}

/// Access entries only reference live records.
#[must_use]
pub fn check_grants_on_live_records(state: &RegistryState) -> bool {
    state
        .access_entries()
        .all(|entry| state.get_record(entry.id).is_ok())
}

/// No access entry names the owner of its record.
#[must_use]
pub fn check_no_owner_entries(state: &RegistryState) -> bool {
    state.access_entries().all(|entry| {
        state
            .get_record(entry.id)
            .map_or(true, |record| record.owner != entry.grantee)
    })
}

/// Owners recorded in `before` are unchanged in `after`.
#[must_use]
pub fn check_owner_immutability(before: &RegistryState, after: &RegistryState) -> bool {
    before.records().all(|old| {
        after
            .records()
            .find(|new| new.id == old.id)
            .is_some_and(|new| new.owner == old.owner)
    })
}

/// Records deleted in `before` are still deleted in `after`.
#[must_use]
pub fn check_deletion_finality(before: &RegistryState, after: &RegistryState) -> bool {
    before.records().filter(|old| !old.exists).all(|old| {
        after
            .records()
            .find(|new| new.id == old.id)
            .is_some_and(|new| !new.exists)
    })
}

/// Check all invariants across one transition.
#[must_use]
pub fn check_all_invariants(before: &RegistryState, after: &RegistryState) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_sequential_ids(after) {
        violations.push(InvariantViolation::NonSequentialIds {
            next_id: after.next_id(),
        });
    }

    for entry in after.access_entries() {
        match after.get_record(entry.id) {
            Err(_) => violations.push(InvariantViolation::GrantOnDeadRecord { id: entry.id }),
            Ok(record) if record.owner == entry.grantee => {
                violations.push(InvariantViolation::OwnerHasEntry {
                    id: entry.id,
                    owner: record.owner,
                });
            }
            Ok(_) => {}
        }
    }

    if !check_owner_immutability(before, after) {
        violations.push(InvariantViolation::OwnerChanged);
    }

    if !check_deletion_finality(before, after) {
        violations.push(InvariantViolation::RecordResurrected);
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Check if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Record ids are not exactly `1..next_id`.
    NonSequentialIds { next_id: FileId },
    /// An access entry points at a missing or deleted record.
    GrantOnDeadRecord { id: FileId },
    /// An owner holds an explicit entry on its own record.
    OwnerHasEntry { id: FileId, owner: Address },
    /// A record's owner differs from the previous state.
    OwnerChanged,
    /// A deleted record is live again.
    RecordResurrected,
}
