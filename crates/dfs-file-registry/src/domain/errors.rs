//! # Error Types
//!
//! Rejections produced by the registry. A rejected operation leaves state
//! untouched and emits no notification.

use shared_types::entities::{Address, FileId};
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors returned by registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Operand is structurally invalid (blank reference, zero address, id 0).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The id was never assigned or its record has been deleted.
    #[error("file record {id} not found")]
    NotFound { id: FileId },

    /// The caller is not the record owner.
    #[error("{caller} is not the owner of file record {id}")]
    Unauthorized { caller: Address, id: FileId },

    /// The journal could not persist or replay an event.
    #[error("journal error: {0}")]
    Journal(String),
}

impl RegistryError {
    /// Stable numeric code used on the wire.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unauthorized { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Journal(_) => 500,
        }
    }

    /// Short machine-readable kind, also used as a metrics label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::Journal(_) => "journal",
        }
    }
}

impl From<JournalError> for RegistryError {
    fn from(err: JournalError) -> Self {
        Self::Journal(err.to_string())
    }
}

// =============================================================================
// JOURNAL ERRORS
// =============================================================================

/// Errors from event journal adapters.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Underlying I/O failure.
    #[error("journal I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the journal lock.
    #[error("journal {} is locked by another process", .0.display())]
    Locked(PathBuf),

    /// A journal line could not be decoded.
    #[error("corrupt journal entry at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// A decoded event does not follow from the state before it.
    #[error("inconsistent journal event #{index}: {reason}")]
    Inconsistent { index: usize, reason: String },

    /// An event could not be encoded.
    #[error("failed to encode event: {0}")]
    Encode(String),

    /// Adapter refused the write.
    #[error("journal unavailable: {0}")]
    Unavailable(String),
}
