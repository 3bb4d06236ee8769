//! Source-address hashing load balancing strategy.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::load_balancer::{random::pick_by_ticket, server::Server, LoadBalancer};
use crate::routing::RequestAttributes;

/// Maps each source address onto the weighted eligible set.
///
/// The same source lands on the same server as long as the eligible set and
/// weights are unchanged. Requests without a source go to the first server.
#[derive(Debug, Default)]
pub struct SourceHash;

impl LoadBalancer for SourceHash {
    fn next_server(&self, servers: &[Arc<Server>], req: &RequestAttributes) -> Option<Arc<Server>> {
        let Some(ip) = req.src_ip else {
            return servers.first().cloned();
        };

        let total: u64 = servers.iter().map(|s| u64::from(s.weight())).sum();
        if total == 0 {
            return None;
        }

        let mut hasher = DefaultHasher::new();
        ip.hash(&mut hasher);
        pick_by_ticket(servers, hasher.finish() % total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::HealthState;
    use std::net::IpAddr;

    #[test]
    fn test_same_source_same_server() {
        let lb = SourceHash;
        let servers: Vec<_> = (0..4)
            .map(|i| Arc::new(Server::new(format!("s{i}"), "127.0.0.1", 8080 + i, 1, HealthState::Up).unwrap()))
            .collect();

        let ip: IpAddr = "192.168.1.20".parse().unwrap();
        let req = RequestAttributes::new("/").with_src_ip(ip);
        let first = lb.next_server(&servers, &req).unwrap();
        for _ in 0..10 {
            assert_eq!(lb.next_server(&servers, &req).unwrap().id(), first.id());
        }
    }

    #[test]
    fn test_no_source_falls_back_to_first() {
        let lb = SourceHash;
        let servers = vec![
            Arc::new(Server::new("s1", "127.0.0.1", 8080, 1, HealthState::Up).unwrap()),
            Arc::new(Server::new("s2", "127.0.0.1", 8081, 1, HealthState::Up).unwrap()),
        ];
        assert_eq!(lb.next_server(&servers, &RequestAttributes::default()).unwrap().id(), "s1");
    }
}
