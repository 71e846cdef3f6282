//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (host, method, attempt) on every probe event
//! - Request ID flows through the HTTP layer via `x-request-id`
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
