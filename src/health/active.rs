//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every server of a backend
//! - Bound each probe by the backend's timeout
//! - Update server health state from the outcome
//!
//! One scheduler task runs per backend. Each tick fans out one probe task per
//! server, so a slow probe never delays the others. A server whose previous
//! probe is still running is skipped for that tick.

use dashmap::DashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::Probe;
use crate::health::state::{HealthState, ProbeOutcome, Transition};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{server::Server, BackendPool};
use crate::observability::metrics;

/// Run one probe against one server and feed the outcome to its state machine.
///
/// Timeouts and probe errors count as failures. Returns the transition, if any.
pub async fn check_server(
    probe: &dyn Probe,
    backend: &str,
    server: &Server,
    config: &HealthCheckConfig,
) -> Option<Transition> {
    if !server.health().is_probed() {
        return None;
    }

    let outcome = match time::timeout(config.timeout(), probe.check(server)).await {
        Ok(Ok(true)) => ProbeOutcome::Success,
        Ok(Ok(false)) => {
            tracing::debug!(backend, server = %server.id(), "Health check failed");
            ProbeOutcome::Failure
        }
        Ok(Err(e)) => {
            tracing::warn!(backend, server = %server.id(), error = %e, "Health check failed: probe error");
            ProbeOutcome::Failure
        }
        Err(_) => {
            tracing::warn!(
                backend,
                server = %server.id(),
                timeout_ms = config.timeout_ms,
                "Health check failed: timeout"
            );
            ProbeOutcome::Failure
        }
    };

    let transition = server.observe_probe(outcome, config.thresholds());
    if let Some(t) = transition {
        if t.to == HealthState::Up {
            tracing::info!(backend, server = %server.id(), from = %t.from, to = %t.to, "Server state changed");
        } else {
            tracing::warn!(backend, server = %server.id(), from = %t.from, to = %t.to, "Server state changed");
        }
        metrics::record_health_transition(backend, server.id(), t.to);
    }
    transition
}

/// Servers with a check currently running, keyed `backend/server`.
///
/// Shared by the monitor and one-off health rounds so a server never has
/// two checks running at once.
#[derive(Debug, Clone, Default)]
pub struct InflightChecks {
    keys: Arc<DashSet<String>>,
}

impl InflightChecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a check as started. `None` if one is already running.
    pub fn try_begin(&self, backend: &str, server: &str) -> Option<InflightGuard> {
        let key = format!("{}/{}", backend, server);
        if !self.keys.insert(key.clone()) {
            return None;
        }
        Some(InflightGuard {
            keys: self.keys.clone(),
            key,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Removes the in-flight marker when the check task ends, however it ends.
#[derive(Debug)]
pub struct InflightGuard {
    keys: Arc<DashSet<String>>,
    key: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

/// Schedules probes for backend pools.
pub struct HealthMonitor {
    probe: Arc<dyn Probe>,
    inflight: InflightChecks,
    shutdown: Shutdown,
}

impl HealthMonitor {
    pub fn new(probe: Arc<dyn Probe>, shutdown: Shutdown) -> Self {
        Self::with_inflight(probe, shutdown, InflightChecks::new())
    }

    /// A monitor that shares its in-flight set with one-off health rounds.
    pub fn with_inflight(probe: Arc<dyn Probe>, shutdown: Shutdown, inflight: InflightChecks) -> Self {
        Self {
            probe,
            inflight,
            shutdown,
        }
    }

    /// Start probing a pool. Returns `None` when checks are disabled for it
    /// or its interval is zero.
    pub fn watch(&self, pool: Arc<BackendPool>) -> Option<JoinHandle<()>> {
        if !pool.health_check().enabled {
            tracing::info!(backend = %pool.id(), "Active health checks disabled");
            return None;
        }
        if pool.health_check().interval().is_zero() {
            tracing::error!(backend = %pool.id(), "Health check interval is zero, not scheduling checks");
            return None;
        }

        let probe = self.probe.clone();
        let inflight = self.inflight.clone();
        let shutdown = self.shutdown.clone();
        Some(tokio::spawn(Self::run(pool, probe, inflight, shutdown)))
    }

    async fn run(
        pool: Arc<BackendPool>,
        probe: Arc<dyn Probe>,
        inflight: InflightChecks,
        shutdown: Shutdown,
    ) {
        let mut shutdown_rx = shutdown.subscribe();
        if shutdown.is_triggered() {
            return;
        }

        let config = pool.health_check().clone();
        tracing::info!(
            backend = %pool.id(),
            interval_ms = config.interval_ms,
            timeout_ms = config.timeout_ms,
            rise = config.rise,
            fall = config.fall,
            "Health monitor starting"
        );

        let mut ticker = time::interval(config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::probe_pool(&pool, &probe, &inflight, &config);
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(backend = %pool.id(), "Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn probe_pool(
        pool: &Arc<BackendPool>,
        probe: &Arc<dyn Probe>,
        inflight: &InflightChecks,
        config: &HealthCheckConfig,
    ) {
        for server in pool.servers().iter() {
            if !server.check_enabled() || !server.health().is_probed() {
                continue;
            }

            let Some(guard) = inflight.try_begin(pool.id(), server.id()) else {
                tracing::debug!(backend = %pool.id(), server = %server.id(), "Previous probe still in flight, skipping");
                continue;
            };
            let backend = pool.id().to_string();
            let server = server.clone();
            let probe = probe.clone();
            let config = config.clone();

            tokio::spawn(async move {
                let _guard = guard;
                check_server(probe.as_ref(), &backend, &server, &config).await;
            });
        }
    }
}
