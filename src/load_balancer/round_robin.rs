//! Weighted round-robin load balancing strategy.
//!
//! Each server holds a credit, filled from its weight. A selection takes the
//! eligible server with the most credit left (earliest in pool order on ties)
//! and spends one credit. When every eligible server is out of credit, all of
//! them are refilled from their current weights.
//!
//! Over any refill-aligned window of `W` selections, where `W` is the total
//! eligible weight, each server is picked exactly `weight` times. Weights are
//! only read at refill: a change lands once the in-progress cycle ends. A
//! server that becomes eligible mid-cycle has no credit until the next refill.
//! Credits follow the server instance, not its id, so a server removed and
//! added back under the same id starts with none.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::load_balancer::{server::Server, LoadBalancer};
use crate::routing::RequestAttributes;

/// Credit-based weighted round-robin selector.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    /// Remaining credit per server instance for the current cycle.
    credits: Mutex<HashMap<u64, u32>>,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_server(&self, servers: &[Arc<Server>], _req: &RequestAttributes) -> Option<Arc<Server>> {
        if servers.is_empty() {
            return None;
        }

        let mut credits = self.credits.lock().unwrap_or_else(PoisonError::into_inner);
        let credit_of = |credits: &HashMap<u64, u32>, s: &Server| credits.get(&s.instance()).copied().unwrap_or(0);

        if servers.iter().all(|s| credit_of(&credits, s) == 0) {
            credits.clear();
            for s in servers {
                credits.insert(s.instance(), s.weight());
            }
            tracing::trace!(servers = servers.len(), "Round-robin credits refilled");
        }

        let mut best: Option<(&Arc<Server>, u32)> = None;
        for s in servers {
            let credit = credit_of(&credits, s);
            if credit > 0 && best.map_or(true, |(_, top)| credit > top) {
                best = Some((s, credit));
            }
        }

        let (server, _) = best?;
        if let Some(credit) = credits.get_mut(&server.instance()) {
            *credit -= 1;
        }
        Some(server.clone())
    }
}
