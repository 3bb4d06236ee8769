//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer per backend
//!     → Probe each server (probe.rs), bounded by timeout
//!     → Update state.rs
//!
//! Administrative commands:
//!     Operator drains / maintains / releases a server
//!     → state.rs validates and applies
//!
//! State machine (state.rs):
//!     Up ←→ Down, with rise/fall thresholds to prevent flapping
//!     Draining, Maintenance: operator-forced
//! ```
//!
//! # Design Decisions
//! - Probe errors and timeouts are failed checks, never errors for callers
//! - Health state is per-server, guarded per-server
//! - The machine is pure and testable without timers

pub mod active;
pub mod probe;
pub mod state;

pub use active::{HealthMonitor, InflightChecks};
pub use probe::{FnProbe, Probe, ProbeError, TcpConnectProbe};
pub use state::{AdminCommand, HealthState};
