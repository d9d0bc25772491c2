//! # Shared Bus - Notification Log for the File Registry
//!
//! Every committed registry operation produces exactly one notification.
//! The bus assigns it the next sequence number, keeps it in an append-only
//! log and fans it out to live subscribers.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()      ┌──────────┐
//! │   Registry   │ ────────────▶ │  Event Bus   │ ────────────────▶ │ Observer │
//! │   Service    │               │ (log + chan) │  subscribe_from() │          │
//! └──────────────┘               └──────────────┘                   └──────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Total order:** sequences start at 1 and have no gaps.
//! - **Replay:** `subscribe_from(filter, n)` yields every record after `n`,
//!   then continues live without duplicates.
//! - **Lag recovery:** a slow subscriber that overruns the channel refills
//!   from the retained log instead of losing records.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventRecord, EventTopic, RegistryEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before falling back to the log.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
