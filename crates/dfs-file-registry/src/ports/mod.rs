//! # Ports Layer
//!
//! Hexagonal boundaries of the registry.

pub mod inbound;
pub mod outbound;

pub use inbound::{CommitReceipt, FileRegistryApi};
pub use outbound::EventJournal;
