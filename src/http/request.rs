//! Request identification.
//!
//! # Responsibilities
//! - Assign a request ID (UUID v4) to every inbound request
//! - Keep a client-supplied `x-request-id` untouched
//! - Expose the ID to handlers and the route template to downstream code
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Same header name is echoed on the response

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID header as text.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Normalized route template for the current request, set by the
/// route-metrics middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate(pub String);

impl RouteTemplate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
