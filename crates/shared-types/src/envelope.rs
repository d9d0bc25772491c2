//! # `AuthenticatedRequest` Envelope
//!
//! The wrapper every inbound registry request travels in.
//!
//! ## Security Properties
//!
//! - **Envelope Authority**: `caller` is set by the authentication layer in
//!   front of the engine and is the sole source of the requester's identity.
//!   Payloads MUST NOT carry a requester field of their own.
//! - **Versioning**: handlers reject versions they do not understand.
//! - **Correlation**: responses echo `correlation_id`.

use crate::entities::Address;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Envelope around a request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedRequest<T> {
    /// Protocol version for forward compatibility.
    pub version: u16,

    /// Pre-verified identity of the requester.
    pub caller: Address,

    /// Echoed back in the response.
    pub correlation_id: Uuid,

    /// Unix timestamp (seconds) when the request was accepted by the transport.
    pub timestamp: u64,

    /// The request itself.
    pub payload: T,
}

impl<T> AuthenticatedRequest<T> {
    /// Current protocol version.
    pub const CURRENT_VERSION: u16 = 1;

    /// Wrap a payload for `caller` with a fresh correlation id.
    pub fn new(caller: Address, payload: T) -> Self {
        Self::with_correlation(caller, Uuid::new_v4(), payload)
    }

    /// Wrap a payload for `caller` reusing a caller-supplied correlation id.
    pub fn with_correlation(caller: Address, correlation_id: Uuid, payload: T) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            caller,
            correlation_id,
            timestamp: current_timestamp(),
            payload,
        }
    }

    /// Returns true if this envelope's version is understood.
    #[must_use]
    pub fn is_supported_version(&self) -> bool {
        self.version == Self::CURRENT_VERSION
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
