//! # Notification Monitor
//!
//! Follows the notification bus from the first retained record and keeps
//! the Prometheus gauges in step with the registry.
//!
//! ```text
//! FileRegistryService ──publish──▶ InMemoryEventBus ──▶ NotificationMonitor
//!                                                          │
//!                                                          ├─ dfs_bus_notifications_total{kind}
//!                                                          ├─ dfs_registry_active_records
//!                                                          └─ dfs_registry_active_grants
//! ```

use std::sync::Arc;

use dfs_file_registry::prelude::FileRegistryApi;
use dfs_telemetry::{
    log_event, log_record_event, metric_inc, ACTIVE_GRANTS, ACTIVE_RECORDS, BUS_NOTIFICATIONS,
};
use shared_bus::{EventFilter, EventRecord, EventSubscriber, Subscription};
use tokio::sync::watch;

/// Background handler that turns notifications into metrics.
pub struct NotificationMonitor<A: FileRegistryApi> {
    /// Subscription that replays the whole log first.
    subscription: Subscription,
    /// Registry used to refresh aggregate gauges.
    api: Arc<A>,
    /// Notifications processed so far.
    observed: u64,
}

impl<A: FileRegistryApi> NotificationMonitor<A> {
    /// Create a monitor that will observe every retained and future record.
    pub fn new(bus: &impl EventSubscriber, api: Arc<A>) -> Self {
        Self {
            subscription: bus.subscribe_from(EventFilter::all(), 0),
            api,
            observed: 0,
        }
    }

    /// Run until `shutdown` flips or the bus closes. Returns the number of
    /// notifications observed.
    ///
    /// Records already available are drained before the shutdown signal is
    /// honored.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        log_event!(info, "monitor", "Notification monitor started");

        loop {
            tokio::select! {
                biased;

                next = self.subscription.recv() => match next {
                    Some(record) => self.observe(&record).await,
                    None => {
                        log_event!(warn, "monitor", "Event bus closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log_event!(
                            info,
                            "monitor",
                            "Shutdown signal received",
                            observed = self.observed
                        );
                        break;
                    }
                }
            }
        }

        self.observed
    }

    async fn observe(&mut self, record: &EventRecord) {
        self.observed += 1;
        metric_inc!(BUS_NOTIFICATIONS, &[record.event.kind()]);

        let stats = self.api.registry_stats().await;
        ACTIVE_RECORDS.set(stats.active_records as f64);
        ACTIVE_GRANTS.set(stats.active_grants as f64);

        log_record_event!(
            debug,
            "monitor",
            "Notification observed",
            record.event.file_id(),
            sequence = record.sequence,
            kind = record.event.kind()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfs_file_registry::prelude::create_test_service;
    use shared_types::Address;

    fn addr(n: u8) -> Address {
        Address([n; 20])
    }

    #[tokio::test]
    async fn test_monitor_counts_backlog_and_live_records() {
        let service = Arc::new(create_test_service().unwrap());
        let receipt = service
            .register(addr(1), "bafy-monitor".into())
            .await
            .unwrap();

        let monitor = NotificationMonitor::new(service.bus().as_ref(), Arc::clone(&service));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(monitor.run(shutdown_rx));

        service
            .grant_access(addr(1), receipt.id, addr(2))
            .await
            .unwrap();
        service.delete_record(addr(1), receipt.id).await.unwrap();

        shutdown_tx.send(true).unwrap();
        assert_eq!(task.await.unwrap(), 3);
    }
}
