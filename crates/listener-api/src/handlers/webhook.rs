//! Webhook ingestion handler.
//!
//! A linear sequence with no retries: answer preflights, require a body,
//! parse it as JSON, build the record, write it once, acknowledge. The
//! caller never learns why a write failed, only which invocation to quote.

use std::sync::Arc;

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use listener_core::{Clock, RecordId, RecordStore, WebhookRecord};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::{internal_error_response, IngestError},
    invocation::InvocationId,
    AppState,
};

/// Message returned with every successful ingestion.
pub const SUCCESS_MESSAGE: &str = "Webhook received successfully";

/// Body of a successful ingestion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    /// Always [`SUCCESS_MESSAGE`].
    pub message: &'static str,
    /// Id of the stored record.
    pub id: RecordId,
    /// ISO-8601 receipt time of the stored record.
    pub timestamp: String,
}

impl Acknowledgement {
    /// Acknowledges `record`.
    pub fn for_record(record: &WebhookRecord) -> Self {
        Self { message: SUCCESS_MESSAGE, id: record.id.clone(), timestamp: record.timestamp.clone() }
    }
}

/// Validates, records and persists one webhook delivery.
///
/// Holds no per-request state, so one instance can serve any number of
/// concurrent invocations.
pub struct WebhookIngestor {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl WebhookIngestor {
    /// Creates an ingestor writing to `store` and timestamping with `clock`.
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Ingests `body` under the record id `id`.
    ///
    /// The receipt time is read after the body has parsed. Exactly one store
    /// write is issued on success and none on any client error.
    ///
    /// # Errors
    ///
    /// - `IngestError::MissingBody` for an empty body
    /// - `IngestError::InvalidJson` when the body does not parse
    /// - `IngestError::Storage` when the write fails
    pub async fn ingest(&self, id: RecordId, body: &[u8]) -> Result<Acknowledgement, IngestError> {
        let payload = parse_payload(body)?;

        let record = WebhookRecord::new(id, payload, self.clock.now_utc());
        let acknowledgement = Acknowledgement::for_record(&record);

        self.store.put(record).await?;

        Ok(acknowledgement)
    }
}

/// Parses a request body into an arbitrary JSON value.
///
/// # Errors
///
/// Returns `IngestError::MissingBody` for an empty body and
/// `IngestError::InvalidJson` for anything that is not a single JSON value.
pub fn parse_payload(body: &[u8]) -> Result<serde_json::Value, IngestError> {
    if body.is_empty() {
        return Err(IngestError::MissingBody);
    }

    serde_json::from_slice(body).map_err(IngestError::InvalidJson)
}

/// Handles a webhook delivery on any method.
///
/// `OPTIONS` is answered as a CORS preflight with an empty 200 and never
/// touches the store. Every other method goes through ingestion. A body
/// that cannot be buffered is reported as a JSON error with the
/// rejection's status.
#[instrument(
    name = "receive_webhook",
    skip_all,
    fields(
        invocation_id = %invocation,
        method = %method,
        body_len = body.as_ref().map_or(0, Bytes::len),
    )
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    Extension(invocation): Extension<InvocationId>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    debug!("Received webhook request");

    if method == Method::OPTIONS {
        debug!("Answering CORS preflight");
        return StatusCode::OK.into_response();
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let e = IngestError::UnreadableBody(rejection);
            warn!(error = %e, status = %e.status_code(), "Rejected unreadable webhook body");
            return e.into_response_for(&invocation);
        },
    };

    let ingestor = WebhookIngestor::new(state.store.clone(), state.clock.clone());

    match ingestor.ingest(invocation.record_id(), &body).await {
        Ok(acknowledgement) => {
            info!(timestamp = %acknowledgement.timestamp, "Webhook stored");
            (StatusCode::OK, Json(acknowledgement)).into_response()
        },
        Err(IngestError::Storage(cause)) => {
            error!(error = %cause, "Failed to store webhook");
            internal_error_response(&invocation)
        },
        Err(e) => {
            warn!(error = %e, "Rejected webhook request");
            e.into_response_for(&invocation)
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use listener_core::{storage::mock::MockRecordStore, TestClock};
    use serde_json::json;

    use super::*;

    fn ingestor(store: &MockRecordStore) -> WebhookIngestor {
        let clock = TestClock::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        WebhookIngestor::new(Arc::new(store.clone()), Arc::new(clock))
    }

    #[test]
    fn empty_body_is_missing() {
        assert!(matches!(parse_payload(b""), Err(IngestError::MissingBody)));
    }

    #[test]
    fn whitespace_body_is_invalid_json() {
        assert!(matches!(parse_payload(b"   "), Err(IngestError::InvalidJson(_))));
    }

    #[test]
    fn trailing_garbage_is_invalid_json() {
        assert!(matches!(parse_payload(b"{} {}"), Err(IngestError::InvalidJson(_))));
        assert!(matches!(parse_payload(b"{not json"), Err(IngestError::InvalidJson(_))));
    }

    #[test]
    fn any_json_shape_parses() {
        assert_eq!(parse_payload(b"{}").unwrap(), json!({}));
        assert_eq!(parse_payload(b"[]").unwrap(), json!([]));
        assert_eq!(parse_payload(br#""string""#).unwrap(), json!("string"));
        assert_eq!(parse_payload(b"42").unwrap(), json!(42));
        assert_eq!(parse_payload(b"null").unwrap(), json!(null));
    }

    #[tokio::test]
    async fn ingest_stores_record_and_acknowledges() {
        let store = MockRecordStore::new();

        let ack = ingestor(&store)
            .ingest(RecordId::from("abc-123"), br#"{"event":"ping"}"#)
            .await
            .unwrap();

        assert_eq!(
            ack,
            Acknowledgement {
                message: SUCCESS_MESSAGE,
                id: RecordId::from("abc-123"),
                timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            }
        );

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, json!({"event": "ping"}));
        assert_eq!(records[0].received_at, 1_704_067_200_000);
    }

    #[tokio::test]
    async fn ingest_does_not_write_on_client_error() {
        let store = MockRecordStore::new();
        let ingestor = ingestor(&store);

        assert!(ingestor.ingest(RecordId::from("a"), b"").await.is_err());
        assert!(ingestor.ingest(RecordId::from("b"), b"{not json").await.is_err());

        assert_eq!(store.put_calls(), 0);
    }

    #[tokio::test]
    async fn ingest_surfaces_store_failure() {
        let store = MockRecordStore::new();
        store.fail_writes("throttled").await;

        let err = ingestor(&store).ingest(RecordId::from("a"), b"{}").await.unwrap_err();

        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(store.put_calls(), 1);
    }
}
