//! Ingestion failures and their wire representation.
//!
//! Client errors are reported with a specific message and no side effects.
//! Everything else collapses into a generic 500 carrying only the invocation
//! id; the underlying cause is logged, never returned.

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use listener_core::CoreError;
use serde::Serialize;
use thiserror::Error;

use crate::invocation::InvocationId;

/// Message returned with every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Reasons an invocation did not store a record.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The body could not be buffered, e.g. it exceeded the size limit.
    #[error("{}", body_rejection_message(.0))]
    UnreadableBody(#[source] BytesRejection),

    /// The request carried no body, or an empty one.
    #[error("Missing request body")]
    MissingBody,

    /// The body is not syntactically valid JSON.
    #[error("Invalid JSON in request body")]
    InvalidJson(#[source] serde_json::Error),

    /// The store rejected or failed the write.
    #[error("Internal server error")]
    Storage(#[from] CoreError),
}

impl IngestError {
    /// HTTP status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnreadableBody(rejection) => rejection.status(),
            Self::MissingBody | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller caused this error.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Renders the error response for `invocation`.
    pub fn into_response_for(self, invocation: &InvocationId) -> Response {
        if self.is_client_error() {
            let body = ErrorResponse { error: self.to_string(), request_id: None };
            (self.status_code(), Json(body)).into_response()
        } else {
            internal_error_response(invocation)
        }
    }
}

fn body_rejection_message(rejection: &BytesRejection) -> &'static str {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "Request body too large"
    } else {
        "Failed to read request body"
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error message.
    pub error: String,
    /// Invocation id, only present on internal errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Builds the generic 500 response for `invocation`.
pub fn internal_error_response(invocation: &InvocationId) -> Response {
    let body = ErrorResponse {
        error: INTERNAL_ERROR_MESSAGE.to_string(),
        request_id: Some(invocation.to_string()),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use listener_core::RecordId;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(IngestError::MissingBody.status_code(), StatusCode::BAD_REQUEST);

        let parse_error = serde_json::from_slice::<serde_json::Value>(b"{not json").unwrap_err();
        let err = IngestError::InvalidJson(parse_error);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
    }

    #[test]
    fn storage_errors_map_to_internal_error() {
        let err = IngestError::from(CoreError::Database("unreachable".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn internal_error_hides_cause_and_reports_request_id() {
        let invocation = InvocationId(RecordId::from("abc-123"));
        let err = IngestError::from(CoreError::Database("password=hunter2".to_string()));

        let response = err.into_response_for(&invocation);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Internal server error", "requestId": "abc-123"})
        );
    }

    #[tokio::test]
    async fn client_error_body_has_no_request_id() {
        let invocation = InvocationId(RecordId::from("abc-123"));
        let response = IngestError::MissingBody.into_response_for(&invocation);

        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Missing request body"})
        );
    }
}
