//! Error taxonomy for the routing-and-health engine.
//!
//! Every fallible engine operation returns [`LbError`] as a plain value.
//! Probe failures never appear here: the health checker absorbs them into
//! the state machine, and the only visible effect on the request path is an
//! eventual [`LbError::NoHealthyServer`].

use thiserror::Error;

use crate::health::state::HealthState;

/// Errors surfaced by administrative and routing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LbError {
    /// An entity with this identifier already exists in its scope.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// The referenced server (or other entity) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Weights must be at least 1.
    #[error("invalid weight {weight} for server {server}: weight must be >= 1")]
    InvalidWeight { server: String, weight: u32 },

    /// No ACL rule matched and no default backend is configured.
    #[error("no route available for request")]
    NoRouteAvailable,

    /// The routed backend has no server eligible for new traffic.
    #[error("no healthy server in backend {0}")]
    NoHealthyServer(String),

    /// A rule or caller referenced a backend that is not registered.
    #[error("backend not found: {0}")]
    BackendNotFound(String),

    /// A runtime addition carries values that configuration loading rejects.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The administrative command is not legal from the server's current state.
    #[error("server {server} cannot move from {from} to {to}")]
    InvalidTransition {
        server: String,
        from: HealthState,
        to: HealthState,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LbError>;
