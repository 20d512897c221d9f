//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID flows through spans so log lines can be correlated
//! - Metric calls are no-ops until a recorder is installed, so library
//!   code and tests can emit them unconditionally
//! - Route labels are always templates from the normalizer, never raw paths

pub mod logging;
pub mod metrics;
