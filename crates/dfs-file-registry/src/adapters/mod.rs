//! # Adapters Layer
//!
//! Implementations of the outbound ports.

pub mod file_journal;
pub mod memory_journal;

pub use file_journal::FileJournal;
pub use memory_journal::InMemoryJournal;
