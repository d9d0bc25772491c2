//! # DFS File Registry - Ownership and Access Control Engine
//!
//! ## Purpose
//!
//! Tracks who registered each file record, which other identities may act
//! on it, and when it may be mutated or removed. Content storage, wallets
//! and presentation live outside this crate; they call in with an already
//! verified caller identity.
//!
//! ## Operations
//!
//! | Operation | Authorization | Notification |
//! |-----------|---------------|--------------|
//! | `register(reference)` | any identity | `Registered { id, reference, owner }` |
//! | `grant_access(id, grantee)` | owner only | `AccessGranted { id, grantee }` |
//! | `revoke_access(id, grantee)` | owner only | `AccessRevoked { id, grantee }` |
//! | `delete_record(id)` | owner only | `Deleted { id }` |
//!
//! Reads (`get_record`, `has_access`, listings, stats) need no authorization.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Ids sequential from 1, never reused | `domain/state.rs` - `apply()`, `domain/invariants.rs` - `check_sequential_ids()` |
//! | Owner never changes | `domain/invariants.rs` - `check_owner_immutability()` |
//! | Grants only on live records | `domain/state.rs` - `apply(Deleted)`, `domain/invariants.rs` - `check_grants_on_live_records()` |
//! | Only the owner mutates | `domain/state.rs` - `require_owner()` |
//! | Redundant grant / absent revoke succeed | `domain/state.rs` - set semantics in `apply()` |
//! | No entry for the owner | `domain/state.rs` - `apply(AccessGranted)` |
//!
//! ## Rejections
//!
//! | Error | Code | Checked |
//! |-------|------|---------|
//! | `InvalidInput` | 400 | first |
//! | `NotFound` | 404 | second |
//! | `Unauthorized` | 403 | third |
//! | `Journal` | 500 | after the decision, before any mutation |
//!
//! ## Usage Example
//!
//! ```ignore
//! use dfs_file_registry::prelude::*;
//!
//! let service = create_test_service()?;
//! let receipt = service.register(alice, "QmHash".into()).await?;
//! service.grant_access(alice, receipt.id, bob).await?;
//! assert!(service.has_access(receipt.id, bob).await?);
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{AccessEntry, Command, FileRecord, RegistryStats};
    pub use crate::domain::errors::{JournalError, RegistryError};
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };
    pub use crate::domain::state::RegistryState;
    pub use crate::domain::value_objects::ContentReference;

    // Ports
    pub use crate::ports::inbound::{CommitReceipt, FileRegistryApi};
    pub use crate::ports::outbound::EventJournal;

    // Adapters
    pub use crate::adapters::{FileJournal, InMemoryJournal};

    // IPC
    pub use crate::ipc::{
        ErrorBody, RawFileId, RegistryRequest, RegistryRequestHandler, RegistryResponse,
        ResponseBody,
    };

    // Service
    pub use crate::service::{
        create_test_service, FileRegistryService, ServiceConfig, ServiceStats,
    };

    // Shared
    pub use shared_bus::{EventRecord, RegistryEvent};
    pub use shared_types::entities::{Address, FileId};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "File Registry";

// =============================================================================
// TESTS
// =============================================================================
