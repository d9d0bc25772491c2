//! # IPC Handler for the File Registry
//!
//! Turns `AuthenticatedRequest<RegistryRequest>` envelopes into calls on a
//! [`FileRegistryApi`] and wraps the outcome in a [`RegistryResponse`].
//!
//! ## Security Model
//!
//! - The envelope `caller` is the only identity used for authorization.
//! - Envelopes with an unknown protocol version are refused before any
//!   operand is inspected.
//! - Operand parsing happens here; the engine only sees typed values.

use super::payloads::{
    parse_address, ErrorBody, RegistryRequest, RegistryResponse, ResponseBody,
};
use crate::domain::errors::RegistryError;
use crate::ports::inbound::{CommitReceipt, FileRegistryApi};
use shared_types::AuthenticatedRequest;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Request handler in front of a registry implementation.
pub struct RegistryRequestHandler<A: FileRegistryApi> {
    api: Arc<A>,
}

impl<A: FileRegistryApi> Clone for RegistryRequestHandler<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: FileRegistryApi> RegistryRequestHandler<A> {
    /// Create a handler around `api`.
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Get the underlying API.
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Handle one request envelope.
    #[instrument(
        skip_all,
        fields(
            correlation_id = %request.correlation_id,
            op = request.payload.op_name(),
            caller = %request.caller,
        )
    )]
    pub async fn handle(&self, request: AuthenticatedRequest<RegistryRequest>) -> RegistryResponse {
        let correlation_id = request.correlation_id;

        if !request.is_supported_version() {
            warn!(version = request.version, "Unsupported request version");
            return RegistryResponse::error(
                correlation_id,
                ErrorBody::unsupported_version(request.version),
            );
        }

        match self.dispatch(request).await {
            Ok(body) => {
                debug!("Request handled");
                RegistryResponse::ok(correlation_id, body)
            }
            Err(err) => {
                debug!(code = err.code(), error = %err, "Request failed");
                RegistryResponse::error(correlation_id, ErrorBody::from(&err))
            }
        }
    }

    async fn dispatch(
        &self,
        request: AuthenticatedRequest<RegistryRequest>,
    ) -> Result<ResponseBody, RegistryError> {
        let caller = request.caller;

        match request.payload {
            RegistryRequest::Register { reference } => {
                self.api.register(caller, reference).await.map(committed)
            }
            RegistryRequest::GrantAccess { id, grantee } => {
                let id = id.parse()?;
                let grantee = parse_address(&grantee, "grantee")?;
                self.api.grant_access(caller, id, grantee).await.map(committed)
            }
            RegistryRequest::RevokeAccess { id, grantee } => {
                let id = id.parse()?;
                let grantee = parse_address(&grantee, "grantee")?;
                self.api.revoke_access(caller, id, grantee).await.map(committed)
            }
            RegistryRequest::DeleteRecord { id } => {
                let id = id.parse()?;
                self.api.delete_record(caller, id).await.map(committed)
            }
            RegistryRequest::GetRecord { id } => {
                let record = self.api.get_record(id.parse()?).await?;
                Ok(ResponseBody::Record { record })
            }
            RegistryRequest::HasAccess { id, identity } => {
                let id = id.parse()?;
                let identity = parse_address(&identity, "identity")?;
                let allowed = self.api.has_access(id, identity).await?;
                Ok(ResponseBody::Access {
                    id,
                    identity,
                    allowed,
                })
            }
            RegistryRequest::ListGrantees { id } => {
                let id = id.parse()?;
                let grantees = self.api.list_grantees(id).await?;
                Ok(ResponseBody::Grantees { id, grantees })
            }
            RegistryRequest::ListOwned { owner } => {
                let owner = parse_address(&owner, "owner")?;
                Ok(ResponseBody::Records {
                    records: self.api.records_owned_by(owner).await,
                })
            }
            RegistryRequest::ListSharedWith { grantee } => {
                let grantee = parse_address(&grantee, "grantee")?;
                Ok(ResponseBody::Records {
                    records: self.api.records_shared_with(grantee).await,
                })
            }
            RegistryRequest::ListActive => Ok(ResponseBody::Records {
                records: self.api.active_records().await,
            }),
            RegistryRequest::Stats => Ok(ResponseBody::Stats {
                stats: self.api.registry_stats().await,
            }),
        }
    }
}

fn committed(receipt: CommitReceipt) -> ResponseBody {
    ResponseBody::Committed {
        id: receipt.id,
        sequence: receipt.notification.sequence,
        notification: receipt.notification.event,
    }
}
