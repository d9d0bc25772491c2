//! # IPC Payloads
//!
//! Wire shapes for requests and responses. Identities and ids arrive as
//! loosely typed JSON and are parsed by the handler, so malformed operands
//! surface as `InvalidInput` responses instead of transport failures.

use crate::domain::entities::{FileRecord, RegistryStats};
use crate::domain::errors::RegistryError;
use serde::{Deserialize, Serialize};
use shared_bus::RegistryEvent;
use shared_types::entities::{Address, FileId};
use uuid::Uuid;

// =============================================================================
// REQUESTS
// =============================================================================

/// A file id as sent by clients: JSON number or decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFileId {
    /// `"id": 7`
    Number(u64),
    /// `"id": "7"`
    Text(String),
}

impl RawFileId {
    /// Parse into a valid [`FileId`].
    ///
    /// # Errors
    ///
    /// `InvalidInput` for non-numeric text or id 0.
    pub fn parse(&self) -> Result<FileId, RegistryError> {
        let parsed = match self {
            Self::Number(0) => return Err(invalid_id("0")),
            Self::Number(n) => FileId(*n),
            Self::Text(text) => text.parse::<FileId>().map_err(|_| invalid_id(text))?,
        };
        Ok(parsed)
    }
}

impl From<u64> for RawFileId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

fn invalid_id(raw: &str) -> RegistryError {
    RegistryError::InvalidInput(format!("invalid file id: {raw:?}"))
}

/// Parse an identity operand.
///
/// # Errors
///
/// `InvalidInput` naming `role` if `raw` is not a `0x`-prefixed 40-digit hex
/// address.
pub fn parse_address(raw: &str, role: &str) -> Result<Address, RegistryError> {
    raw.parse()
        .map_err(|e| RegistryError::InvalidInput(format!("invalid {role} address: {e}")))
}

/// Operations accepted by the request handler.
///
/// The requester's identity is never part of the payload; it comes from
/// the enclosing `AuthenticatedRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryRequest {
    /// Register a new record.
    Register { reference: String },
    /// Grant access to a record.
    GrantAccess { id: RawFileId, grantee: String },
    /// Revoke access to a record.
    RevokeAccess { id: RawFileId, grantee: String },
    /// Delete a record.
    DeleteRecord { id: RawFileId },
    /// Look up a live record.
    GetRecord { id: RawFileId },
    /// Owner-or-grantee check.
    HasAccess { id: RawFileId, identity: String },
    /// Grantees of a record.
    ListGrantees { id: RawFileId },
    /// Records owned by an identity.
    ListOwned { owner: String },
    /// Records shared with an identity.
    ListSharedWith { grantee: String },
    /// Every live record, in id order.
    ListActive,
    /// Aggregate counters.
    Stats,
}

impl RegistryRequest {
    /// Operation label for logs and metrics.
    #[must_use]
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::GrantAccess { .. } => "grant_access",
            Self::RevokeAccess { .. } => "revoke_access",
            Self::DeleteRecord { .. } => "delete_record",
            Self::GetRecord { .. } => "get_record",
            Self::HasAccess { .. } => "has_access",
            Self::ListGrantees { .. } => "list_grantees",
            Self::ListOwned { .. } => "list_owned",
            Self::ListSharedWith { .. } => "list_shared_with",
            Self::ListActive => "list_active",
            Self::Stats => "stats",
        }
    }

    /// True for operations that change state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Register { .. }
                | Self::GrantAccess { .. }
                | Self::RevokeAccess { .. }
                | Self::DeleteRecord { .. }
        )
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Successful response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseBody {
    /// A mutation was committed.
    Committed {
        id: FileId,
        sequence: u64,
        notification: RegistryEvent,
    },
    /// A single record.
    Record { record: FileRecord },
    /// Result of an access check.
    Access {
        id: FileId,
        identity: Address,
        allowed: bool,
    },
    /// Grantees of a record.
    Grantees { id: FileId, grantees: Vec<Address> },
    /// A listing of records.
    Records { records: Vec<FileRecord> },
    /// Aggregate counters.
    Stats { stats: RegistryStats },
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable numeric code.
    pub code: u16,
    /// Machine-readable kind.
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorBody {
    /// Code for envelopes with an unknown protocol version.
    pub const UNSUPPORTED_VERSION: u16 = 505;

    /// Envelope version not understood.
    #[must_use]
    pub fn unsupported_version(version: u16) -> Self {
        Self {
            code: Self::UNSUPPORTED_VERSION,
            kind: "unsupported_version".into(),
            message: format!("unsupported protocol version {version}"),
        }
    }
}

impl From<&RegistryError> for ErrorBody {
    fn from(err: &RegistryError) -> Self {
        Self {
            code: err.code(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Response to one request, echoing its correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryResponse {
    /// Correlation id of the request.
    pub correlation_id: Uuid,
    /// Present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseBody>,
    /// Present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl RegistryResponse {
    /// Successful response.
    #[must_use]
    pub fn ok(correlation_id: Uuid, body: ResponseBody) -> Self {
        Self {
            correlation_id,
            result: Some(body),
            error: None,
        }
    }

    /// Failed response.
    #[must_use]
    pub fn error(correlation_id: Uuid, error: ErrorBody) -> Self {
        Self {
            correlation_id,
            result: None,
            error: Some(error),
        }
    }

    /// True if the request succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Error code, if the request failed.
    #[must_use]
    pub fn error_code(&self) -> Option<u16> {
        self.error.as_ref().map(|e| e.code)
    }
}
