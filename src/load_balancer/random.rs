//! Weighted random load balancing strategy.

use rand::Rng;
use std::sync::Arc;

use crate::load_balancer::{server::Server, LoadBalancer};
use crate::routing::RequestAttributes;

/// Picks a server at random, proportionally to its weight.
#[derive(Debug, Default)]
pub struct WeightedRandom;

impl LoadBalancer for WeightedRandom {
    fn next_server(&self, servers: &[Arc<Server>], _req: &RequestAttributes) -> Option<Arc<Server>> {
        let total: u64 = servers.iter().map(|s| u64::from(s.weight())).sum();
        if total == 0 {
            return None;
        }
        let ticket = rand::thread_rng().gen_range(0..total);
        pick_by_ticket(servers, ticket)
    }
}

/// Walk cumulative weights until `ticket` falls inside a server's span.
pub(crate) fn pick_by_ticket(servers: &[Arc<Server>], mut ticket: u64) -> Option<Arc<Server>> {
    for s in servers {
        let weight = u64::from(s.weight());
        if ticket < weight {
            return Some(s.clone());
        }
        ticket -= weight;
    }
    None
}
