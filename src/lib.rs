//! Route-shaping gateway instrumentation.
//!
//! Learns route templates (`/api/resource/:param`) from live traffic so
//! metrics and traces can be labeled by route shape instead of raw path.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod normalizer;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use normalizer::{PathNormalizer, PARAM_PLACEHOLDER};
