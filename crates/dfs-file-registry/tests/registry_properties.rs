//! # Registry Property Tests
//!
//! Exercise the registry through its public service API and the
//! notification bus, the way an external caller would.
//!
//! ## Test Categories
//!
//! 1. **Id Allocation** - sequential under concurrency, never reused
//! 2. **Authorization** - non-owners rejected with state untouched
//! 3. **Deletion Finality** - every later operation is `NotFound`
//! 4. **Idempotence** - redundant grant, absent revoke
//! 5. **Notifications** - commit order, replay, failures invisible
//! 6. **Journal Failure** - all-or-nothing commits

use dfs_file_registry::prelude::*;
use shared_bus::{EventFilter, EventSubscriber, InMemoryEventBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_stream::StreamExt;

// =============================================================================
// TEST HELPERS
// =============================================================================

type Service = FileRegistryService<InMemoryJournal, InMemoryEventBus>;

fn alice() -> Address {
    "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1".parse().unwrap()
}

fn bob() -> Address {
    "0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0".parse().unwrap()
}

fn carol() -> Address {
    "0xc4c4c4c4c4c4c4c4c4c4c4c4c4c4c4c4c4c4c4c4".parse().unwrap()
}

fn make_service() -> Arc<Service> {
    Arc::new(create_test_service().unwrap())
}

fn history(service: &Service) -> Vec<RegistryEvent> {
    service.bus().history().into_iter().map(|r| r.event).collect()
}

/// Journal whose appends can be switched to fail.
struct FlakyJournal {
    inner: InMemoryJournal,
    failing: Arc<AtomicBool>,
}

impl EventJournal for FlakyJournal {
    fn load(&self) -> Result<Vec<RegistryEvent>, JournalError> {
        self.inner.load()
    }

    fn append(&mut self, event: &RegistryEvent) -> Result<(), JournalError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(JournalError::Unavailable("disk full".into()));
        }
        self.inner.append(event)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

// =============================================================================
// END-TO-END SCENARIO
// =============================================================================

#[tokio::test]
async fn scenario_register_grant_delegate_delete() {
    let service = make_service();

    let receipt = service.register(alice(), "cid-A".into()).await.unwrap();
    assert_eq!(receipt.id, FileId(1));

    service.grant_access(alice(), FileId(1), bob()).await.unwrap();

    let err = service.grant_access(bob(), FileId(1), bob()).await.unwrap_err();
    assert_eq!(
        err,
        RegistryError::Unauthorized {
            caller: bob(),
            id: FileId(1)
        }
    );

    service.delete_record(alice(), FileId(1)).await.unwrap();

    let err = service.grant_access(alice(), FileId(1), bob()).await.unwrap_err();
    assert_eq!(err, RegistryError::NotFound { id: FileId(1) });

    assert_eq!(
        history(&service),
        vec![
            RegistryEvent::Registered {
                id: FileId(1),
                reference: "cid-A".into(),
                owner: alice(),
            },
            RegistryEvent::AccessGranted {
                id: FileId(1),
                grantee: bob(),
            },
            RegistryEvent::Deleted { id: FileId(1) },
        ]
    );
}

// =============================================================================
// ID ALLOCATION
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_get_distinct_sequential_ids() {
    let service = make_service();
    let callers = [alice(), bob(), carol()];

    let mut handles = Vec::new();
    for i in 0..60u64 {
        let service = Arc::clone(&service);
        let caller = callers[(i % 3) as usize];
        handles.push(tokio::spawn(async move {
            service.register(caller, format!("cid-{i}")).await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id.get());
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=60).collect::<Vec<_>>());

    // Commit order and id order agree.
    let registered: Vec<u64> = history(&service).iter().map(|e| e.file_id().get()).collect();
    assert_eq!(registered, (1..=60).collect::<Vec<_>>());
}

#[tokio::test]
async fn deleted_ids_are_never_reused() {
    let service = make_service();

    let first = service.register(alice(), "cid-A".into()).await.unwrap().id;
    service.delete_record(alice(), first).await.unwrap();
    let second = service.register(alice(), "cid-A".into()).await.unwrap().id;

    assert_eq!(first, FileId(1));
    assert_eq!(second, FileId(2));
    assert_eq!(service.registry_stats().await.total_registered, 2);
    assert_eq!(service.registry_stats().await.active_records, 1);
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

#[tokio::test]
async fn non_owner_mutations_leave_state_unchanged() {
    let service = make_service();
    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;
    service.grant_access(alice(), id, carol()).await.unwrap();

    let before = service.snapshot().await;
    let log_before = service.bus().last_sequence();

    assert!(matches!(
        service.grant_access(bob(), id, bob()).await,
        Err(RegistryError::Unauthorized { .. })
    ));
    assert!(matches!(
        service.revoke_access(bob(), id, carol()).await,
        Err(RegistryError::Unauthorized { .. })
    ));
    // A grantee is not an owner.
    assert!(matches!(
        service.delete_record(carol(), id).await,
        Err(RegistryError::Unauthorized { .. })
    ));

    assert_eq!(service.snapshot().await, before);
    assert_eq!(service.bus().last_sequence(), log_before);
}

#[tokio::test]
async fn owner_never_changes_across_grants() {
    let service = make_service();
    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;

    service.grant_access(alice(), id, bob()).await.unwrap();
    service.grant_access(alice(), id, carol()).await.unwrap();
    service.revoke_access(alice(), id, bob()).await.unwrap();

    assert_eq!(service.get_record(id).await.unwrap().owner, alice());
    assert_eq!(service.records_owned_by(alice()).await.len(), 1);
    assert!(service.records_owned_by(carol()).await.is_empty());
}

#[tokio::test]
async fn invalid_operands_rejected_before_existence() {
    let service = make_service();

    let err = service.delete_record(alice(), FileId(0)).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidInput(_)));

    let err = service
        .grant_access(bob(), FileId(7), Address::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidInput(_)));

    let err = service.register(alice(), "".into()).await.unwrap_err();
    assert_eq!(err.code(), 400);

    assert!(service.bus().is_empty());
}

// =============================================================================
// DELETION FINALITY
// =============================================================================

#[tokio::test]
async fn every_operation_after_delete_is_not_found() {
    let service = make_service();
    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;
    service.grant_access(alice(), id, bob()).await.unwrap();
    service.delete_record(alice(), id).await.unwrap();

    let not_found = RegistryError::NotFound { id };
    assert_eq!(service.grant_access(alice(), id, bob()).await.unwrap_err(), not_found);
    assert_eq!(service.revoke_access(alice(), id, bob()).await.unwrap_err(), not_found);
    assert_eq!(service.delete_record(alice(), id).await.unwrap_err(), not_found);
    // Existence is checked before ownership.
    assert_eq!(service.delete_record(bob(), id).await.unwrap_err(), not_found);
    assert_eq!(service.get_record(id).await.unwrap_err(), not_found);
    assert_eq!(service.has_access(id, bob()).await.unwrap_err(), not_found);

    assert!(service.records_shared_with(bob()).await.is_empty());
    assert_eq!(service.registry_stats().await.active_grants, 0);
}

// =============================================================================
// IDEMPOTENCE
// =============================================================================

#[tokio::test]
async fn redundant_grant_and_absent_revoke_succeed() {
    let service = make_service();
    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;

    service.grant_access(alice(), id, bob()).await.unwrap();
    let after_one = service.snapshot().await;
    service.grant_access(alice(), id, bob()).await.unwrap();
    assert_eq!(service.snapshot().await, after_one);

    service.revoke_access(alice(), id, bob()).await.unwrap();
    let after_revoke = service.snapshot().await;
    service.revoke_access(alice(), id, bob()).await.unwrap();
    assert_eq!(service.snapshot().await, after_revoke);

    // Each success still produced one notification.
    assert_eq!(service.bus().last_sequence(), 5);
}

#[tokio::test]
async fn self_grant_is_a_notified_no_op() {
    let service = make_service();
    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;

    let receipt = service.grant_access(alice(), id, alice()).await.unwrap();
    assert_eq!(
        receipt.notification.event,
        RegistryEvent::AccessGranted { id, grantee: alice() }
    );
    assert!(service.list_grantees(id).await.unwrap().is_empty());
    assert!(service.has_access(id, alice()).await.unwrap());
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

#[tokio::test]
async fn notifications_follow_commit_order_and_skip_failures() {
    let service = make_service();
    let mut live = service.bus().subscribe(EventFilter::all());

    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;
    let _ = service.delete_record(bob(), id).await;
    service.grant_access(alice(), id, bob()).await.unwrap();
    let _ = service.register(alice(), " ".into()).await;
    service.delete_record(alice(), id).await.unwrap();

    let mut received = Vec::new();
    for _ in 0..3 {
        let record = timeout(Duration::from_millis(200), live.recv())
            .await
            .expect("timeout")
            .expect("bus closed");
        received.push((record.sequence, record.event.kind()));
    }

    assert_eq!(
        received,
        vec![(1, "register"), (2, "grant_access"), (3, "delete_record")]
    );
    assert!(live.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn late_subscriber_replays_full_history() {
    let service = make_service();
    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;
    service.grant_access(alice(), id, bob()).await.unwrap();
    service.revoke_access(alice(), id, bob()).await.unwrap();

    let mut late = service.bus().subscribe_from(EventFilter::all(), 0);
    service.delete_record(alice(), id).await.unwrap();

    let mut sequences = Vec::new();
    for _ in 0..4 {
        let record = timeout(Duration::from_millis(200), late.recv())
            .await
            .expect("timeout")
            .expect("bus closed");
        sequences.push(record.sequence);
    }
    assert_eq!(sequences, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn file_stream_replays_backlog_then_follows_live() {
    let service = make_service();
    let first = service.register(alice(), "cid-A".into()).await.unwrap().id;
    let second = service.register(alice(), "cid-B".into()).await.unwrap().id;
    service.grant_access(alice(), second, bob()).await.unwrap();

    let stream = service
        .bus()
        .event_stream_from(EventFilter::for_files(vec![second]), 0);

    service.delete_record(alice(), first).await.unwrap();
    service.revoke_access(alice(), second, bob()).await.unwrap();

    let records: Vec<(u64, &str)> = timeout(
        Duration::from_millis(200),
        stream.take(3).map(|r| (r.sequence, r.event.kind())).collect(),
    )
    .await
    .expect("timeout");

    assert_eq!(
        records,
        vec![(2, "register"), (3, "grant_access"), (5, "revoke_access")]
    );
}

// =============================================================================
// JOURNAL FAILURE
// =============================================================================

#[tokio::test]
async fn journal_failure_is_all_or_nothing() {
    let failing = Arc::new(AtomicBool::new(false));
    let journal = FlakyJournal {
        inner: InMemoryJournal::new(),
        failing: Arc::clone(&failing),
    };
    let service = FileRegistryService::open(
        journal,
        Arc::new(InMemoryEventBus::new()),
        ServiceConfig::default(),
    )
    .unwrap();

    let id = service.register(alice(), "cid-A".into()).await.unwrap().id;
    let before = service.snapshot().await;

    failing.store(true, Ordering::SeqCst);
    let err = service.grant_access(alice(), id, bob()).await.unwrap_err();
    assert!(matches!(err, RegistryError::Journal(_)));
    let err = service.register(alice(), "cid-B".into()).await.unwrap_err();
    assert_eq!(err.code(), 500);

    assert_eq!(service.snapshot().await, before);
    assert_eq!(service.bus().last_sequence(), 1);
    assert_eq!(service.stats().await.journal_failures, 2);

    // Recovery: the failed registration did not consume an id.
    failing.store(false, Ordering::SeqCst);
    let next = service.register(alice(), "cid-B".into()).await.unwrap();
    assert_eq!(next.id, FileId(2));
    assert_eq!(next.notification.sequence, 2);
}
