//! Middleware de request id y tracing.
//!
//! Every request gets an `x-request-id` (kept if the caller sent one, a
//! UUID v4 otherwise). The id is echoed on the response and recorded on the
//! request span.

use axum::{
    body::Body,
    http::{HeaderName, Request},
};
use tracing::{Span, info_span};

/// Header name for request ID.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Builds the per-request span for `TraceLayer`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}
