//! Session and traffic accounting.
//!
//! Counters live on the servers themselves, so a snapshot is just a read of
//! each server's atomics. There is no global lock: a backend total is
//! consistent per field, not across servers.
//!
//! Start and end calls for one request must pair exactly once. This is a
//! contract on the caller and is not checked at runtime.

use std::sync::Arc;

use crate::error::Result;
use crate::load_balancer::{server::Server, BackendManager};
use crate::observability::metrics;
use crate::stats::snapshot::{BackendStats, ServerStats, StatsScope, StatsSnapshot};

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    backends: Arc<BackendManager>,
}

impl StatsAggregator {
    pub fn new(backends: Arc<BackendManager>) -> Self {
        Self { backends }
    }

    /// Count the start of a request on a server already in hand.
    pub fn record_start(&self, backend: &str, server: &Server) {
        server.begin_request();
        metrics::record_request(backend, server.id());
    }

    /// Count the start of a request by id.
    pub fn record_request_start(&self, backend: &str, server: &str) -> Result<()> {
        let server = self.backends.get(backend)?.server(server)?;
        self.record_start(backend, &server);
        Ok(())
    }

    /// Count the end of a request and the bytes it moved.
    pub fn record_request_end(&self, backend: &str, server: &str, bytes_in: u64, bytes_out: u64) -> Result<()> {
        let server = self.backends.get(backend)?.server(server)?;
        server.end_request(bytes_in, bytes_out);
        Ok(())
    }

    /// Read counters for a server, a backend, or everything.
    pub fn snapshot(&self, scope: &StatsScope) -> Result<StatsSnapshot> {
        match scope {
            StatsScope::Server { backend, server } => {
                let server = self.backends.get(backend)?.server(server)?;
                Ok(StatsSnapshot::Server(ServerStats::read(&server)))
            }
            StatsScope::Backend(backend) => {
                let pool = self.backends.get(backend)?;
                Ok(StatsSnapshot::Backend(BackendStats::read(&pool)))
            }
            StatsScope::All => Ok(StatsSnapshot::All {
                backends: self.backends.all().iter().map(|p| BackendStats::read(p)).collect(),
            }),
        }
    }
}
