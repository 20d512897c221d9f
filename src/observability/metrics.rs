//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_http_requests_total` (counter): requests by method, route, status
//! - `gateway_http_request_duration_seconds` (histogram): latency by method, route
//! - `route_normalizer_cache_hits_total` / `_misses_total` (counter)
//! - `route_normalizer_promotions_total` (counter): positions turned into `:param`
//! - `route_normalizer_cache_entries` (gauge)
//! - `route_normalizer_trie_nodes` (gauge)
//! - `gateway_config_reloads_total` (counter): by outcome (`ok`, `rejected`, `dropped`)
//!
//! # Design Decisions
//! - `route` label carries the normalized template, bounding cardinality
//! - Prometheus exporter runs its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Prometheus metrics exporter started");
    Ok(())
}

fn describe() {
    describe_counter!(
        "gateway_http_requests_total",
        "Requests handled, labeled by route template"
    );
    describe_histogram!(
        "gateway_http_request_duration_seconds",
        metrics::Unit::Seconds,
        "Request latency, labeled by route template"
    );
    describe_counter!(
        "route_normalizer_cache_hits_total",
        "Template lookups served from cache"
    );
    describe_counter!(
        "route_normalizer_cache_misses_total",
        "Template lookups that walked the trie"
    );
    describe_counter!(
        "route_normalizer_promotions_total",
        "Path positions promoted to parameters"
    );
    describe_gauge!("route_normalizer_cache_entries", "Cached path templates");
    describe_gauge!("route_normalizer_trie_nodes", "Live route trie nodes");
    describe_counter!("gateway_config_reloads_total", "Configuration reload attempts");
}

/// Record a completed request under its route template.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    counter!(
        "gateway_http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(elapsed);
}

pub fn record_template_cache_hit() {
    counter!("route_normalizer_cache_hits_total").increment(1);
}

pub fn record_template_cache_miss() {
    counter!("route_normalizer_cache_misses_total").increment(1);
}

pub fn record_promotions(count: usize) {
    counter!("route_normalizer_promotions_total").increment(count as u64);
}

pub fn record_normalizer_size(cache_entries: usize, trie_nodes: usize) {
    gauge!("route_normalizer_cache_entries").set(cache_entries as f64);
    gauge!("route_normalizer_trie_nodes").set(trie_nodes as f64);
}

pub fn record_config_reload(outcome: &'static str) {
    counter!("gateway_config_reloads_total", "outcome" => outcome).increment(1);
}
