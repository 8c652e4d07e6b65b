//! Fixed, permissive CORS policy.
//!
//! Every response carries the same three headers. There is no origin
//! allow-list and no authentication; both are open hardening gaps if the
//! listener is exposed beyond a prototype.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// The headers stamped onto every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", "Content-Type"),
    ("access-control-allow-methods", "POST"),
];

/// Middleware adding the CORS headers to every outgoing response.
///
/// Runs outermost so responses produced by other layers (timeouts, body
/// limit rejections, unknown routes) are covered too.
pub async fn stamp_cors_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    response
}
