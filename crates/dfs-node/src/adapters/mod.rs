//! # Node Adapters
//!
//! Runtime-selected implementations of the registry's outbound ports.

pub mod journal;

pub use journal::NodeJournal;
