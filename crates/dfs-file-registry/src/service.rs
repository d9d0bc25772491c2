//! # File Registry Service
//!
//! Serializes every operation through one lock and runs each commit as
//!
//! ```text
//! evaluate ──▶ journal.append ──▶ state.apply ──▶ bus.publish
//! ```
//!
//! without any suspension point once the lock is held, so a commit is never
//! observed half-done and a dropped caller future cannot interrupt it. A
//! rejection at any step before `apply` leaves state and the notification
//! log untouched.
//!
//! Journal appends run synchronously on the calling worker thread. With a
//! `FileJournal` each commit waits for an fsync, which bounds throughput to
//! one fsync per mutation.

use crate::domain::entities::{Command, FileRecord, RegistryStats};
use crate::domain::errors::{JournalError, RegistryError};
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};
use crate::domain::state::RegistryState;
use crate::domain::value_objects::ContentReference;
use crate::ports::inbound::{CommitReceipt, FileRegistryApi};
use crate::ports::outbound::EventJournal;

use async_trait::async_trait;
use shared_bus::{EventPublisher, RegistryEvent};
use shared_types::entities::{Address, FileId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// File Registry Service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Verify domain invariants after every commit.
    pub check_invariants: bool,
}

/// Statistics for the File Registry Service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Committed registrations.
    pub registrations: u64,
    /// Committed grants.
    pub grants: u64,
    /// Committed revocations.
    pub revocations: u64,
    /// Committed deletions.
    pub deletions: u64,
    /// Rejected with `InvalidInput`.
    pub rejected_invalid_input: u64,
    /// Rejected with `NotFound`.
    pub rejected_not_found: u64,
    /// Rejected with `Unauthorized`.
    pub rejected_unauthorized: u64,
    /// Journal append failures.
    pub journal_failures: u64,
    /// Events replayed from the journal at startup.
    pub replayed_events: u64,
    /// Commits after which an invariant check failed.
    pub invariant_violations: u64,
}

impl ServiceStats {
    /// Total committed operations.
    #[must_use]
    pub fn committed(&self) -> u64 {
        self.registrations + self.grants + self.revocations + self.deletions
    }

    /// Total rejected operations.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected_invalid_input
            + self.rejected_not_found
            + self.rejected_unauthorized
            + self.journal_failures
    }

    fn record_commit(&mut self, event: &RegistryEvent) {
        match event {
            RegistryEvent::Registered { .. } => self.registrations += 1,
            RegistryEvent::AccessGranted { .. } => self.grants += 1,
            RegistryEvent::AccessRevoked { .. } => self.revocations += 1,
            RegistryEvent::Deleted { .. } => self.deletions += 1,
        }
    }

    fn record_rejection(&mut self, err: &RegistryError) {
        match err {
            RegistryError::InvalidInput(_) => self.rejected_invalid_input += 1,
            RegistryError::NotFound { .. } => self.rejected_not_found += 1,
            RegistryError::Unauthorized { .. } => self.rejected_unauthorized += 1,
            RegistryError::Journal(_) => self.journal_failures += 1,
        }
    }
}

/// State, journal and counters guarded together.
struct RegistryCore<J> {
    state: RegistryState,
    journal: J,
    stats: ServiceStats,
}

/// The main File Registry Service.
///
/// This service:
/// 1. Validates and authorizes each operation against the current state
/// 2. Persists the resulting event to the journal
/// 3. Applies it to the in-memory state
/// 4. Publishes it on the notification bus
pub struct FileRegistryService<J: EventJournal, B: EventPublisher> {
    /// Service configuration.
    config: ServiceConfig,
    /// Serialization boundary for all reads and writes.
    core: Mutex<RegistryCore<J>>,
    /// Notification bus.
    bus: Arc<B>,
}

impl<J: EventJournal, B: EventPublisher> FileRegistryService<J, B> {
    /// Open the service, replaying every event already in `journal`.
    ///
    /// Replayed events are republished on `bus`, which should be empty, so the
    /// notification log matches the journal one to one.
    ///
    /// # Errors
    ///
    /// `RegistryError::Journal` if the journal cannot be read or an event
    /// does not follow from the state before it.
    pub fn open(journal: J, bus: Arc<B>, config: ServiceConfig) -> Result<Self, RegistryError> {
        let events = journal.load()?;
        let mut state = RegistryState::new();

        for (index, event) in events.iter().enumerate() {
            state.apply(event).map_err(|err| match err {
                JournalError::Inconsistent { reason, .. } => {
                    JournalError::Inconsistent { index, reason }
                }
                other => other,
            })?;
            bus.publish(event.clone());
        }

        let stats = ServiceStats {
            replayed_events: events.len() as u64,
            ..ServiceStats::default()
        };

        info!(
            replayed = events.len(),
            next_id = %state.next_id(),
            active_records = state.active_record_count(),
            "File registry opened"
        );

        Ok(Self {
            config,
            core: Mutex::new(RegistryCore {
                state,
                journal,
                stats,
            }),
            bus,
        })
    }

    /// Get the notification bus.
    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// Get the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.core.lock().await.stats.clone()
    }

    /// Snapshot of the full state.
    pub async fn snapshot(&self) -> RegistryState {
        self.core.lock().await.state.clone()
    }

    /// Number of events in the journal.
    pub async fn journal_len(&self) -> usize {
        self.core.lock().await.journal.len()
    }

    async fn commit(&self, caller: Address, command: Command) -> Result<CommitReceipt, RegistryError> {
        let mut guard = self.core.lock().await;
        let core = &mut *guard;

        let event = match core.state.evaluate(caller, &command) {
            Ok(event) => event,
            Err(err) => {
                warn!(operation = command.name(), %caller, error = %err, "Operation rejected");
                core.stats.record_rejection(&err);
                return Err(err);
            }
        };

        // Runs on the async worker while the lock is held. A file journal
        // blocks here on `sync_data`; readers wait on the same lock.
        if let Err(err) = core.journal.append(&event) {
            error!(operation = command.name(), error = %err, "Journal append failed");
            let err = RegistryError::from(err);
            core.stats.record_rejection(&err);
            return Err(err);
        }

        let before = self.config.check_invariants.then(|| core.state.clone());
        core.state.apply(&event)?;

        if let Some(before) = before {
            if let InvariantCheckResult::Invalid(violations) =
                check_all_invariants(&before, &core.state)
            {
                error!(?violations, operation = command.name(), "Invariant violation after commit");
                core.stats.invariant_violations += 1;
            }
        }

        core.stats.record_commit(&event);
        let notification = self.bus.publish(event);

        debug!(
            operation = command.name(),
            sequence = notification.sequence,
            file_id = %notification.event.file_id(),
            "Operation committed"
        );

        Ok(CommitReceipt {
            id: notification.event.file_id(),
            notification,
        })
    }
}

#[async_trait]
impl<J: EventJournal, B: EventPublisher> FileRegistryApi for FileRegistryService<J, B> {
    #[instrument(skip_all, fields(%caller))]
    async fn register(&self, caller: Address, reference: String) -> Result<CommitReceipt, RegistryError> {
        let reference = match ContentReference::parse(reference) {
            Ok(reference) => reference,
            Err(err) => {
                warn!(%caller, error = %err, "Registration rejected");
                self.core.lock().await.stats.record_rejection(&err);
                return Err(err);
            }
        };
        let receipt = self.commit(caller, Command::Register { reference }).await?;
        info!(file_id = %receipt.id, "File registered");
        Ok(receipt)
    }

    #[instrument(skip_all, fields(%caller, %id, %grantee))]
    async fn grant_access(
        &self,
        caller: Address,
        id: FileId,
        grantee: Address,
    ) -> Result<CommitReceipt, RegistryError> {
        let receipt = self.commit(caller, Command::GrantAccess { id, grantee }).await?;
        info!("Access granted");
        Ok(receipt)
    }

    #[instrument(skip_all, fields(%caller, %id, %grantee))]
    async fn revoke_access(
        &self,
        caller: Address,
        id: FileId,
        grantee: Address,
    ) -> Result<CommitReceipt, RegistryError> {
        let receipt = self.commit(caller, Command::RevokeAccess { id, grantee }).await?;
        info!("Access revoked");
        Ok(receipt)
    }

    #[instrument(skip_all, fields(%caller, %id))]
    async fn delete_record(&self, caller: Address, id: FileId) -> Result<CommitReceipt, RegistryError> {
        let receipt = self.commit(caller, Command::DeleteRecord { id }).await?;
        info!("File record deleted");
        Ok(receipt)
    }

    async fn get_record(&self, id: FileId) -> Result<FileRecord, RegistryError> {
        self.core.lock().await.state.get_record(id).cloned()
    }

    async fn has_access(&self, id: FileId, identity: Address) -> Result<bool, RegistryError> {
        self.core.lock().await.state.has_access(id, identity)
    }

    async fn list_grantees(&self, id: FileId) -> Result<Vec<Address>, RegistryError> {
        self.core.lock().await.state.list_grantees(id)
    }

    async fn records_owned_by(&self, owner: Address) -> Vec<FileRecord> {
        self.core.lock().await.state.records_owned_by(owner)
    }

    async fn records_shared_with(&self, grantee: Address) -> Vec<FileRecord> {
        self.core.lock().await.state.records_shared_with(grantee)
    }

    async fn active_records(&self) -> Vec<FileRecord> {
        self.core.lock().await.state.active_records()
    }

    async fn registry_stats(&self) -> RegistryStats {
        self.core.lock().await.state.stats()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

/// Create an in-memory service for testing.
///
/// # Errors
///
/// Never fails for an empty in-memory journal; the `Result` mirrors `open`.
pub fn create_test_service() -> Result<
    FileRegistryService<crate::adapters::InMemoryJournal, shared_bus::InMemoryEventBus>,
    RegistryError,
> {
    FileRegistryService::open(
        crate::adapters::InMemoryJournal::new(),
        Arc::new(shared_bus::InMemoryEventBus::new()),
        ServiceConfig {
            check_invariants: true,
        },
    )
}
