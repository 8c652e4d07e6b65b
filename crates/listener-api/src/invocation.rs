//! Per-invocation identity and the outer safety net.
//!
//! Every request is assigned an id before any handler runs. The same id
//! becomes the stored record's key, the `requestId` of internal errors and
//! the `X-Request-Id` response header. A panic anywhere below this layer is
//! turned into the generic 500 response instead of dropping the connection.

use std::{any::Any, fmt, panic::AssertUnwindSafe};

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use listener_core::RecordId;
use tracing::error;

use crate::{error::internal_error_response, AppState};

/// Identifier of the current invocation, available as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationId(pub RecordId);

impl InvocationId {
    /// Returns the identifier used as the record key.
    pub fn record_id(&self) -> RecordId {
        self.0.clone()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Middleware assigning an invocation id and catching handler panics.
pub async fn assign_invocation_id(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let invocation = InvocationId(state.ids.next_id());
    req.extensions_mut().insert(invocation.clone());

    let mut response = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            error!(
                invocation_id = %invocation,
                panic = %panic_message(panic.as_ref()),
                "Webhook handling panicked"
            );
            internal_error_response(&invocation)
        },
    };

    if let Ok(value) = HeaderValue::from_str(invocation.0.as_str()) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_common_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }

    #[test]
    fn display_matches_record_id() {
        let invocation = InvocationId(RecordId::from("abc-123"));
        assert_eq!(invocation.to_string(), "abc-123");
        assert_eq!(invocation.record_id(), RecordId::from("abc-123"));
    }
}
