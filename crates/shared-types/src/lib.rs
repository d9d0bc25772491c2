//! # Shared Types Crate
//!
//! Identities, record identifiers and the request envelope used across the
//! workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-crate primitives are defined here.
//! - **Envelope Authority**: the `AuthenticatedRequest<T>` caller is the only
//!   identity a handler trusts; payloads never repeat it.

pub mod entities;
pub mod envelope;

pub use entities::*;
pub use envelope::AuthenticatedRequest;
