//! Statistics subsystem.
//!
//! # Data Flow
//! ```text
//! Routing decision → aggregator.rs (record start)
//! Caller finishes  → aggregator.rs (record end, bytes)
//! Health monitor   → server transition counter
//! Query            → snapshot.rs (derived view, read at call time)
//! ```

pub mod aggregator;
pub mod snapshot;

pub use aggregator::StatsAggregator;
pub use snapshot::{BackendStats, ServerStats, StatsScope, StatsSnapshot};
