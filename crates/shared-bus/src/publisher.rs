//! # Event Publisher
//!
//! Defines the publishing side of the bus and the in-memory log that backs it.

use crate::events::{EventFilter, EventRecord, RegistryEvent};
use crate::subscriber::{EventStream, EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Trait for publishing notifications to the bus.
///
/// `publish` is synchronous so the registry can call it inside its commit
/// without introducing a suspension point.
pub trait EventPublisher: Send + Sync {
    /// Append a notification and fan it out to live subscribers.
    ///
    /// # Returns
    ///
    /// The record as stored, carrying its assigned sequence number.
    fn publish(&self, event: RegistryEvent) -> EventRecord;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Every published record is retained in an append-only log, so observers
/// that subscribe late can replay history. Live delivery uses
/// `tokio::sync::broadcast`; subscribers that lag behind the channel recover
/// the missed records from the log.
pub struct InMemoryEventBus {
    /// Broadcast sender for live delivery.
    sender: broadcast::Sender<EventRecord>,

    /// Retained log, index `i` holds sequence `i + 1`.
    log: Arc<RwLock<Vec<EventRecord>>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            log: Arc::new(RwLock::new(Vec::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Get a stream of events matching a filter, starting after
    /// `after_sequence` (0 replays everything).
    #[must_use]
    pub fn event_stream_from(&self, filter: EventFilter, after_sequence: u64) -> EventStream {
        EventStream::new(self.subscribe_from(filter, after_sequence))
    }

    /// Get a stream of live events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Snapshot of every retained record.
    #[must_use]
    pub fn history(&self) -> Vec<EventRecord> {
        self.log.read().clone()
    }

    /// Sequence of the newest record, 0 when empty.
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.log.read().len() as u64
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    /// True if nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn subscribe_after(&self, filter: EventFilter, after_sequence: Option<u64>) -> Subscription {
        // Holding the read lock while creating the receiver means no publish
        // can land between the backlog snapshot and the live channel.
        let log = self.log.read();
        let start = after_sequence.unwrap_or(log.len() as u64);
        let backlog = log
            .iter()
            .skip(usize::try_from(start).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        let receiver = self.sender.subscribe();
        drop(log);

        debug!(topics = ?filter.topics, after = start, "New subscription created");

        Subscription::new(receiver, filter, self.log.clone(), backlog, start)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: RegistryEvent) -> EventRecord {
        let mut log = self.log.write();
        let record = EventRecord {
            sequence: log.len() as u64 + 1,
            event,
        };
        log.push(record.clone());

        self.events_published.fetch_add(1, Ordering::Relaxed);

        // Sending under the write lock keeps live delivery in log order.
        match self.sender.send(record.clone()) {
            Ok(receivers) => debug!(
                sequence = record.sequence,
                topic = ?record.event.topic(),
                receivers,
                "Event published"
            ),
            Err(_) => debug!(
                sequence = record.sequence,
                topic = ?record.event.topic(),
                "Event retained (no live receivers)"
            ),
        }

        record
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.subscribe_after(filter, None)
    }

    fn subscribe_from(&self, filter: EventFilter, after_sequence: u64) -> Subscription {
        self.subscribe_after(filter, Some(after_sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::FileId;

    fn deleted(id: u64) -> RegistryEvent {
        RegistryEvent::Deleted { id: FileId(id) }
    }

    #[test]
    fn test_publish_no_subscribers_is_retained() {
        let bus = InMemoryEventBus::new();

        let record = bus.publish(deleted(1));
        assert_eq!(record.sequence, 1);
        assert_eq!(bus.events_published(), 1);
        assert_eq!(bus.history(), vec![record]);
    }

    #[test]
    fn test_sequences_are_contiguous() {
        let bus = InMemoryEventBus::new();
        for id in 1..=5 {
            bus.publish(deleted(id));
        }

        let sequences: Vec<u64> = bus.history().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert_eq!(bus.last_sequence(), 5);
        assert_eq!(bus.len(), 5);
    }

    #[test]
    fn test_publish_with_subscriber() {
        let bus = InMemoryEventBus::new();
        let _sub = bus.subscribe(EventFilter::all());

        bus.publish(deleted(1));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_custom_capacity() {
        let bus = InMemoryEventBus::with_capacity(100);
        assert_eq!(bus.capacity(), 100);

        let bus = InMemoryEventBus::with_capacity(0);
        assert_eq!(bus.capacity(), 1);
    }

    #[test]
    fn test_default_bus() {
        let bus = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.events_published(), 0);
        assert!(bus.is_empty());
    }
}
