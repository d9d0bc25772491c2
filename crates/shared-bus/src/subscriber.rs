//! # Event Subscriber
//!
//! Defines the subscription side of the bus. A subscription first drains its
//! replay backlog, then follows the live channel. Records are delivered at
//! most once and in sequence order.

use crate::events::{EventFilter, EventRecord};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// Trait for subscribing to events from the bus.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to events published from now on.
    fn subscribe(&self, filter: EventFilter) -> Subscription;

    /// Subscribe to every retained event after `after_sequence`, then
    /// continue with live events. `0` replays the full history.
    fn subscribe_from(&self, filter: EventFilter, after_sequence: u64) -> Subscription;
}

/// A subscription handle for receiving events.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<EventRecord>,

    /// Filter for this subscription.
    filter: EventFilter,

    /// Shared log, used to recover after lagging.
    log: Arc<RwLock<Vec<EventRecord>>>,

    /// Records to deliver before reading the live channel.
    backlog: VecDeque<EventRecord>,

    /// Highest sequence observed, matched or not.
    last_sequence: u64,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(
        receiver: broadcast::Receiver<EventRecord>,
        filter: EventFilter,
        log: Arc<RwLock<Vec<EventRecord>>>,
        backlog: VecDeque<EventRecord>,
        last_sequence: u64,
    ) -> Self {
        Self {
            receiver,
            filter,
            log,
            backlog,
            last_sequence,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(record)` - The next matching record
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<EventRecord> {
        loop {
            if let Some(record) = self.backlog.pop_front() {
                if let Some(record) = self.accept(record) {
                    return Some(record);
                }
                continue;
            }

            match self.receiver.recv().await {
                Ok(record) => {
                    if let Some(record) = self.accept(record) {
                        return Some(record);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, replaying from log");
                    self.refill_from_log();
                }
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` - A record was available and matched
    /// - `Ok(None)` - No record available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<EventRecord>, SubscriptionError> {
        loop {
            if let Some(record) = self.backlog.pop_front() {
                if let Some(record) = self.accept(record) {
                    return Ok(Some(record));
                }
                continue;
            }

            match self.receiver.try_recv() {
                Ok(record) => {
                    if let Some(record) = self.accept(record) {
                        return Ok(Some(record));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => self.refill_from_log(),
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Highest sequence this subscription has moved past.
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    fn accept(&mut self, record: EventRecord) -> Option<EventRecord> {
        if record.sequence <= self.last_sequence {
            return None;
        }
        self.last_sequence = record.sequence;
        self.filter.matches(&record.event).then_some(record)
    }

    fn refill_from_log(&mut self) {
        let log = self.log.read();
        let skip = usize::try_from(self.last_sequence).unwrap_or(usize::MAX);
        self.backlog.extend(log.iter().skip(skip).cloned());
    }
}

type RecvFuture = Pin<Box<dyn Future<Output = (Option<EventRecord>, Subscription)> + Send>>;

async fn next_record(mut subscription: Subscription) -> (Option<EventRecord>, Subscription) {
    let record = subscription.recv().await;
    (record, subscription)
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct EventStream {
    filter: EventFilter,
    inflight: Option<RecvFuture>,
}

impl EventStream {
    /// Create a new event stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self {
            filter: subscription.filter().clone(),
            inflight: Some(Box::pin(next_record(subscription))),
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = EventRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(inflight) = self.inflight.as_mut() else {
            return Poll::Ready(None);
        };

        match inflight.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready((record, subscription)) => {
                self.inflight = record
                    .is_some()
                    .then(|| Box::pin(next_record(subscription)) as RecvFuture);
                Poll::Ready(record)
            }
        }
    }
}
