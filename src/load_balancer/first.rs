//! First-available load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{server::Server, LoadBalancer};
use crate::routing::RequestAttributes;

/// Always picks the first eligible server in pool order.
#[derive(Debug, Default)]
pub struct FirstAvailable;

impl LoadBalancer for FirstAvailable {
    fn next_server(&self, servers: &[Arc<Server>], _req: &RequestAttributes) -> Option<Arc<Server>> {
        servers.first().cloned()
    }
}
