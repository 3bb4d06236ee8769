//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! ACL resolved → backend id identified
//!     → pool.rs (look up pool, snapshot eligible servers)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (weighted credits, the default)
//!         - least_conn.rs (fewest active sessions)
//!         - first.rs / random.rs / source.rs
//!     → server.rs (chosen server; counters updated by the engine)
//!     → Return server or NoHealthyServer
//! ```
//!
//! # Design Decisions
//! - Pools are copy-on-write: selection works on a stable snapshot
//! - Algorithm selection per backend
//! - Only Up servers are offered to the algorithm

pub mod first;
pub mod least_conn;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod server;
pub mod source;

use std::sync::Arc;

use crate::config::Algorithm;
use crate::routing::RequestAttributes;
use self::server::Server;

pub use pool::{BackendManager, BackendPool};

/// A server selection strategy.
///
/// `servers` holds only eligible servers, in pool order.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_server(&self, servers: &[Arc<Server>], req: &RequestAttributes) -> Option<Arc<Server>>;
}

/// Build the strategy for a configured algorithm.
pub fn for_algorithm(algorithm: Algorithm) -> Box<dyn LoadBalancer> {
    match algorithm {
        Algorithm::RoundRobin => Box::new(round_robin::WeightedRoundRobin::new()),
        Algorithm::LeastConn => Box::new(least_conn::LeastConnections::new()),
        Algorithm::First => Box::new(first::FirstAvailable),
        Algorithm::Random => Box::new(random::WeightedRandom),
        Algorithm::Source => Box::new(source::SourceHash),
    }
}
