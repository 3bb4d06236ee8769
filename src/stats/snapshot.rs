//! Read-only statistics views.

use serde::Serialize;

use crate::health::state::HealthState;
use crate::load_balancer::{server::Server, BackendPool};

/// What a snapshot covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsScope {
    Server { backend: String, server: String },
    Backend(String),
    All,
}

/// Counters of one server at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub id: String,
    pub address: String,
    pub weight: u32,
    pub state: HealthState,
    pub active_sessions: u64,
    /// Every routed request opens one session.
    pub total_sessions: u64,
    pub requests: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub health_transitions: u64,
}

impl ServerStats {
    pub fn read(server: &Server) -> Self {
        let requests = server.total_requests();
        Self {
            id: server.id().to_string(),
            address: server.address(),
            weight: server.weight(),
            state: server.state(),
            active_sessions: server.active_sessions(),
            total_sessions: requests,
            requests,
            bytes_in: server.bytes_in(),
            bytes_out: server.bytes_out(),
            health_transitions: server.health_transitions(),
        }
    }
}

/// Sum over the servers of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStats {
    pub id: String,
    pub active_sessions: u64,
    pub total_sessions: u64,
    pub requests: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub servers_up: usize,
    pub servers_total: usize,
    pub servers: Vec<ServerStats>,
}

impl BackendStats {
    pub fn read(pool: &BackendPool) -> Self {
        let servers: Vec<ServerStats> = pool.servers().iter().map(|s| ServerStats::read(s)).collect();
        Self {
            id: pool.id().to_string(),
            active_sessions: servers.iter().map(|s| s.active_sessions).sum(),
            total_sessions: servers.iter().map(|s| s.total_sessions).sum(),
            requests: servers.iter().map(|s| s.requests).sum(),
            bytes_in: servers.iter().map(|s| s.bytes_in).sum(),
            bytes_out: servers.iter().map(|s| s.bytes_out).sum(),
            servers_up: servers.iter().filter(|s| s.state.accepts_new_traffic()).count(),
            servers_total: servers.len(),
            servers,
        }
    }
}

/// Result of a stats query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum StatsSnapshot {
    Server(ServerStats),
    Backend(BackendStats),
    All { backends: Vec<BackendStats> },
}
