//! # JSON-Lines Session
//!
//! The node's request transport. Each input line is one request:
//!
//! ```text
//! {"caller": "0x…", "correlation_id": "…", "version": 1, "request": {"op": "register", "reference": "bafy…"}}
//! ```
//!
//! `correlation_id` and `version` are optional. Each request produces exactly
//! one response line, in input order. Blank lines are skipped. A line that is
//! not a valid request is answered with an `invalid_input` error that echoes
//! the correlation id when one could be read.

use dfs_file_registry::ipc::payloads::parse_address;
use dfs_file_registry::prelude::{
    ErrorBody, FileRegistryApi, RegistryError, RegistryRequest, RegistryRequestHandler,
    RegistryResponse,
};
use dfs_telemetry::{metric_inc, HistogramTimer, REGISTRY_OPERATIONS, REGISTRY_REJECTIONS};
use serde::Deserialize;
use shared_types::AuthenticatedRequest;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Operation label used for lines that never reached the handler.
const MALFORMED_OP: &str = "malformed";

/// Transport failures. Request failures are responses, not errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the stream failed.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Counters for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Lines answered.
    pub requests: u64,
    /// Successful responses.
    pub succeeded: u64,
    /// Error responses.
    pub failed: u64,
}

/// One request line as sent by a client.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestLine {
    caller: String,
    #[serde(default)]
    correlation_id: Option<Uuid>,
    #[serde(default)]
    version: Option<u16>,
    request: RegistryRequest,
}

/// Serves one JSON-lines stream against a registry.
pub struct Session<A: FileRegistryApi> {
    handler: RegistryRequestHandler<A>,
}

impl<A: FileRegistryApi> Session<A> {
    /// Create a session backed by `handler`.
    pub fn new(handler: RegistryRequestHandler<A>) -> Self {
        Self { handler }
    }

    /// Answer every line of `reader` on `writer` until end of input.
    ///
    /// # Errors
    ///
    /// `SessionError` if the stream fails. Requests that fail are answered
    /// with an error response and do not end the session.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<SessionSummary, SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut summary = SessionSummary::default();
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.process_line(&line).await else {
                continue;
            };

            summary.requests += 1;
            if response.is_ok() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }

            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;
        }

        info!(
            requests = summary.requests,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Session input closed"
        );
        Ok(summary)
    }

    /// Answer one input line. Returns `None` for blank lines.
    pub async fn process_line(&self, line: &str) -> Option<RegistryResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let decoded = decode_line(line);
        let op = match &decoded {
            Ok(request) => request.payload.op_name(),
            Err(_) => MALFORMED_OP,
        };
        let _timer = HistogramTimer::for_operation(op);

        let response = match decoded {
            Ok(request) => {
                let mutation = request.payload.is_mutation();
                let response = self.handler.handle(request).await;
                if response.is_ok() && mutation {
                    metric_inc!(REGISTRY_OPERATIONS, &[op]);
                }
                response
            }
            Err((correlation_id, err)) => {
                warn!(%correlation_id, error = %err, "Malformed request line");
                RegistryResponse::error(correlation_id, ErrorBody::from(&err))
            }
        };

        if let Some(error) = &response.error {
            metric_inc!(REGISTRY_REJECTIONS, &[op, error.kind.as_str()]);
        }
        debug!(op, ok = response.is_ok(), "Request answered");

        Some(response)
    }
}

/// Decode a line into an envelope. On failure, returns the correlation id
/// to echo (nil when none could be read) with the error.
fn decode_line(line: &str) -> Result<AuthenticatedRequest<RegistryRequest>, (Uuid, RegistryError)> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
        (
            Uuid::nil(),
            RegistryError::InvalidInput(format!("request is not valid JSON: {e}")),
        )
    })?;

    let correlation_id = value
        .get("correlation_id")
        .and_then(serde_json::Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .unwrap_or_else(Uuid::nil);

    let parsed: RequestLine = serde_json::from_value(value).map_err(|e| {
        (
            correlation_id,
            RegistryError::InvalidInput(format!("malformed request: {e}")),
        )
    })?;

    let caller = parse_address(&parsed.caller, "caller").map_err(|e| (correlation_id, e))?;

    let mut request = match parsed.correlation_id {
        Some(id) => AuthenticatedRequest::with_correlation(caller, id, parsed.request),
        None => AuthenticatedRequest::new(caller, parsed.request),
    };
    if let Some(version) = parsed.version {
        request.version = version;
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfs_file_registry::prelude::{create_test_service, ResponseBody};
    use std::sync::Arc;

    const ALICE: &str = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";

    fn session() -> Session<impl FileRegistryApi> {
        Session::new(RegistryRequestHandler::new(Arc::new(
            create_test_service().unwrap(),
        )))
    }

    #[tokio::test]
    async fn test_blank_line_is_skipped() {
        assert!(session().process_line("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_register_line() {
        let line = format!(
            r#"{{"caller":"{ALICE}","request":{{"op":"register","reference":"bafy-1"}}}}"#
        );
        let response = session().process_line(&line).await.unwrap();
        assert!(matches!(
            response.result,
            Some(ResponseBody::Committed { sequence: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_not_json_is_invalid_input() {
        let response = session().process_line("{not json").await.unwrap();
        assert_eq!(response.correlation_id, Uuid::nil());
        assert_eq!(response.error_code(), Some(400));
    }

    #[tokio::test]
    async fn test_unknown_op_echoes_correlation_id() {
        let correlation_id = Uuid::new_v4();
        let line = format!(
            r#"{{"caller":"{ALICE}","correlation_id":"{correlation_id}","request":{{"op":"transfer","id":1}}}}"#
        );
        let response = session().process_line(&line).await.unwrap();
        assert_eq!(response.correlation_id, correlation_id);
        assert_eq!(response.error_code(), Some(400));
    }

    #[tokio::test]
    async fn test_bad_caller_is_invalid_input() {
        let line = r#"{"caller":"alice","request":{"op":"stats"}}"#;
        let response = session().process_line(line).await.unwrap();
        assert_eq!(response.error_code(), Some(400));
        assert_eq!(response.error.unwrap().kind, "invalid_input");
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let line = format!(r#"{{"caller":"{ALICE}","version":9,"request":{{"op":"stats"}}}}"#);
        let response = session().process_line(&line).await.unwrap();
        assert_eq!(response.error_code(), Some(505));
    }

    #[tokio::test]
    async fn test_latency_recorded_per_operation() {
        use dfs_telemetry::OPERATION_DURATION;

        let before = OPERATION_DURATION
            .with_label_values(&[MALFORMED_OP])
            .get_sample_count();
        session().process_line("garbage").await.unwrap();
        assert!(
            OPERATION_DURATION
                .with_label_values(&[MALFORMED_OP])
                .get_sample_count()
                > before
        );
    }
}
