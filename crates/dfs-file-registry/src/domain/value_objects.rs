//! # Value Objects
//!
//! Validated operands accepted by the registry.

use super::errors::RegistryError;
use serde::{Deserialize, Serialize};
use shared_types::entities::{Address, FileId};
use std::fmt;

/// Upper bound on the length of a content reference, in bytes.
pub const MAX_REFERENCE_LEN: usize = 4096;

/// Opaque content locator (for example an IPFS CID).
///
/// Never checked for reachability; only rejected when blank or oversized.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentReference(String);

impl ContentReference {
    /// Validate and wrap a reference.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the reference is empty, whitespace only, or longer
    /// than [`MAX_REFERENCE_LEN`].
    pub fn parse(raw: impl Into<String>) -> Result<Self, RegistryError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(RegistryError::InvalidInput(
                "content reference must not be empty".into(),
            ));
        }
        if raw.len() > MAX_REFERENCE_LEN {
            return Err(RegistryError::InvalidInput(format!(
                "content reference exceeds {MAX_REFERENCE_LEN} bytes"
            )));
        }
        Ok(Self(raw))
    }

    /// Borrow the reference text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the owned string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentReference({:?})", self.0)
    }
}

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject the all-zero address wherever an identity is an operand.
///
/// # Errors
///
/// `InvalidInput` naming `role` when `address` is zero.
pub fn require_identity(address: Address, role: &str) -> Result<Address, RegistryError> {
    if address.is_zero() {
        return Err(RegistryError::InvalidInput(format!(
            "{role} must not be the zero address"
        )));
    }
    Ok(address)
}

/// Reject ids below [`FileId::FIRST`].
///
/// # Errors
///
/// `InvalidInput` for id 0.
pub fn require_file_id(id: FileId) -> Result<FileId, RegistryError> {
    if !id.is_valid() {
        return Err(RegistryError::InvalidInput(format!(
            "file id {id} is not a valid record id"
        )));
    }
    Ok(id)
}
