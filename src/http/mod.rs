//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → request.rs (assign request ID)
//!     → middleware/route_metrics.rs (path → route template, metrics)
//!     → server.rs forward_handler (send to upstream)
//!     → Send response to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, RouteTemplate, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
