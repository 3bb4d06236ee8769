//! Least Connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{server::Server, LoadBalancer};
use crate::routing::RequestAttributes;

/// Least connections selector.
/// Selects the server with the fewest active sessions.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(&self, servers: &[Arc<Server>], _req: &RequestAttributes) -> Option<Arc<Server>> {
        // In case of tie, the first one is selected (stability)
        servers.iter().min_by_key(|s| s.active_sessions()).cloned()
    }
}
