//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Routing engine, pools, health monitor produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Structured fields (backend, server, state) on every event
//! - Metrics are cheap (atomic increments) and optional to collect

pub mod logging;
pub mod metrics;
