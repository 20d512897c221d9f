//! Route-labeled request metrics.
//!
//! Every request is mapped to its learned route template before it reaches
//! a handler; the template is the only path-derived label ever recorded.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::{RequestIdExt, RouteTemplate};
use crate::normalizer::PathNormalizer;
use crate::observability::metrics;

pub async fn route_metrics_middleware(
    State(normalizer): State<Arc<PathNormalizer>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let raw = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| request.uri().path());
    let template = normalizer.normalize(raw);
    let method = request.method().to_string();

    tracing::debug!(
        request_id = %request.request_id(),
        method = %method,
        route = %template,
        "Resolved route template"
    );

    request
        .extensions_mut()
        .insert(RouteTemplate(template.clone()));
    let response = next.run(request).await;

    metrics::record_request(&method, &template, response.status().as_u16(), start);
    response
}
