//! Request middleware.

pub mod route_metrics;

pub use route_metrics::route_metrics_middleware;
