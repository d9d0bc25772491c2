//! # Domain Layer
//!
//! Pure registry logic. No I/O, no async, no locking.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod state;
pub mod value_objects;

pub use entities::{AccessEntry, Command, FileRecord, RegistryStats};
pub use errors::{JournalError, RegistryError};
pub use invariants::{check_all_invariants, InvariantCheckResult, InvariantViolation};
pub use state::RegistryState;
pub use value_objects::{ContentReference, MAX_REFERENCE_LEN};
