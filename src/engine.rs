//! Routing engine façade.
//!
//! # Data Flow
//! ```text
//! RequestAttributes
//!     → AclRouter::route          (NoRouteAvailable)
//!     → BackendManager::get       (BackendNotFound)
//!     → BackendPool::select_server (NoHealthyServer)
//!     → StatsAggregator::record_start
//!     → RoutingDecision
//! ```
//!
//! The engine is an owned value; share it with `Arc` where background tasks
//! need it. The health monitor mutates server state concurrently; the request
//! path only reads it and never waits on a probe.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::{
    AclConfig, Algorithm, BackendConfig, BalancerConfig, FrontendConfig, HealthCheckConfig, ServerConfig,
};
use crate::error::Result;
use crate::health::active::{check_server, HealthMonitor, InflightChecks};
use crate::health::probe::Probe;
use crate::health::state::{AdminCommand, Transition};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{server::Server, BackendManager, BackendPool};
use crate::observability::metrics;
use crate::render::{AclRuleView, BackendView, ConfigRenderer, ConfigView, HaproxyRenderer, ServerView};
use crate::routing::{AclRouter, RequestAttributes};
use crate::stats::{StatsAggregator, StatsScope, StatsSnapshot};

/// Where a request was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub backend_id: String,
    pub server_id: String,
    pub address: String,
}

/// One line of `list_backends`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendSummary {
    pub id: String,
    pub algorithm: Algorithm,
    pub servers: usize,
    pub servers_up: usize,
}

/// A state change seen during a one-off probe round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub backend: String,
    pub server: String,
    pub transition: Transition,
}

pub struct RoutingEngine {
    frontend: FrontendConfig,
    default_health: HealthCheckConfig,
    backends: Arc<BackendManager>,
    acl: AclRouter,
    stats: StatsAggregator,
    inflight: InflightChecks,
    monitor: Mutex<Option<HealthMonitor>>,
}

impl RoutingEngine {
    /// Build the engine from a startup configuration.
    pub fn from_config(config: &BalancerConfig) -> Result<Self> {
        let backends = Arc::new(BackendManager::new(&config.backends, &config.health_check)?);
        let acl = AclRouter::from_config(&config.acl);
        let stats = StatsAggregator::new(backends.clone());

        for pool in backends.all().iter() {
            for server in pool.servers().iter() {
                metrics::record_server_state(pool.id(), server.id(), server.state());
            }
        }

        tracing::info!(
            backends = config.backends.len(),
            rules = config.acl.rules.len(),
            default_backend = ?config.acl.default_backend,
            "Routing engine initialized"
        );

        Ok(Self {
            frontend: config.frontend.clone(),
            default_health: config.health_check.clone(),
            backends,
            acl,
            stats,
            inflight: InflightChecks::new(),
            monitor: Mutex::new(None),
        })
    }

    fn monitor(&self) -> MutexGuard<'_, Option<HealthMonitor>> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Request path ---

    /// Route a request to a server and count the session start.
    ///
    /// The caller must later report the end with [`RoutingEngine::record_request_end`].
    pub fn handle_request(&self, req: &RequestAttributes) -> Result<RoutingDecision> {
        let result = self.route(req);
        match &result {
            Ok(decision) => tracing::debug!(
                path = %req.path,
                host = ?req.host,
                backend = %decision.backend_id,
                server = %decision.server_id,
                "Request routed"
            ),
            Err(e) => {
                tracing::debug!(path = %req.path, host = ?req.host, error = %e, "Request not routed");
                metrics::record_route_failure(e);
            }
        }
        result
    }

    fn route(&self, req: &RequestAttributes) -> Result<RoutingDecision> {
        let backend_id = self.acl.route(req)?;
        let pool = self.backends.get(&backend_id)?;
        let server = pool.select_server(req)?;
        self.stats.record_start(&backend_id, &server);

        Ok(RoutingDecision {
            address: server.address(),
            server_id: server.id().to_string(),
            backend_id,
        })
    }

    /// Count the end of a routed request.
    pub fn record_request_end(&self, decision: &RoutingDecision, bytes_in: u64, bytes_out: u64) -> Result<()> {
        self.stats
            .record_request_end(&decision.backend_id, &decision.server_id, bytes_in, bytes_out)
    }

    // --- Administration ---

    pub fn list_backends(&self) -> Vec<BackendSummary> {
        self.backends
            .all()
            .iter()
            .map(|pool| BackendSummary {
                id: pool.id().to_string(),
                algorithm: pool.algorithm(),
                servers: pool.servers().len(),
                servers_up: pool.list_eligible().len(),
            })
            .collect()
    }

    /// Register a new backend. Health checks start for it if the monitor runs.
    pub fn add_backend(&self, config: &BackendConfig) -> Result<()> {
        let pool = self
            .backends
            .add_backend(BackendPool::from_config(config, &self.default_health)?)?;
        if let Some(monitor) = self.monitor().as_ref() {
            monitor.watch(pool);
        }
        Ok(())
    }

    pub fn add_server(&self, backend: &str, spec: &ServerConfig) -> Result<()> {
        let pool = self.backends.get(backend)?;
        let server = pool.add_server(Server::from_config(spec)?)?;
        metrics::record_server_state(backend, server.id(), server.state());
        Ok(())
    }

    pub fn remove_server(&self, backend: &str, server: &str) -> Result<()> {
        self.backends.get(backend)?.remove_server(server)?;
        Ok(())
    }

    pub fn set_weight(&self, backend: &str, server: &str, weight: u32) -> Result<()> {
        self.backends.get(backend)?.set_weight(server, weight)
    }

    /// Drain, maintain or release a server.
    pub fn set_server_state(&self, backend: &str, server: &str, command: AdminCommand) -> Result<Option<Transition>> {
        let server = self.backends.get(backend)?.server(server)?;
        let transition = server.administer(command)?;
        if let Some(t) = transition {
            tracing::info!(
                backend,
                server = %server.id(),
                from = %t.from,
                to = %t.to,
                "Server state set by operator"
            );
            metrics::record_health_transition(backend, server.id(), t.to);
        }
        Ok(transition)
    }

    /// Swap the ACL table. Unknown targets surface as BackendNotFound when routed.
    pub fn replace_rules(&self, acl: &AclConfig) {
        self.acl.replace(acl);
    }

    // --- Read side ---

    /// Current ACL rules in configuration form.
    pub fn rules(&self) -> AclConfig {
        self.acl.to_config()
    }

    pub fn get_stats(&self, scope: &StatsScope) -> Result<StatsSnapshot> {
        self.stats.snapshot(scope)
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn backends(&self) -> &Arc<BackendManager> {
        &self.backends
    }

    /// Read-only traversal for renderers.
    pub fn view(&self) -> ConfigView {
        let table = self.acl.snapshot();
        ConfigView {
            frontend: self.frontend.clone(),
            acl_rules: table
                .rules
                .iter()
                .map(|rule| AclRuleView {
                    name: rule.name.clone(),
                    conditions: rule.matcher.conditions(),
                    backend: rule.backend.clone(),
                })
                .collect(),
            default_backend: table.default_backend.clone(),
            backends: self
                .backends
                .all()
                .iter()
                .map(|pool| BackendView {
                    id: pool.id().to_string(),
                    algorithm: pool.algorithm(),
                    mode: pool.mode(),
                    health_check: pool.health_check().clone(),
                    servers: pool
                        .servers()
                        .iter()
                        .map(|s| ServerView {
                            id: s.id().to_string(),
                            host: s.host().to_string(),
                            port: s.port(),
                            weight: s.weight(),
                            check: s.check_enabled(),
                            state: s.state(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn render_with(&self, renderer: &dyn ConfigRenderer) -> String {
        renderer.render(&self.view())
    }

    /// Native HAProxy configuration for the current model.
    pub fn generate_config(&self) -> String {
        self.render_with(&HaproxyRenderer)
    }

    // --- Health ---

    /// Start background probing of every backend.
    ///
    /// Only one monitor runs per engine; later calls return no handles.
    pub fn start_health_checks(&self, probe: Arc<dyn Probe>, shutdown: Shutdown) -> Vec<JoinHandle<()>> {
        let mut slot = self.monitor();
        if slot.is_some() {
            tracing::warn!("Health checks already running, ignoring start request");
            return Vec::new();
        }

        let monitor = HealthMonitor::with_inflight(probe, shutdown, self.inflight.clone());
        let handles = self
            .backends
            .all()
            .iter()
            .filter_map(|pool| monitor.watch(pool.clone()))
            .collect();
        *slot = Some(monitor);
        handles
    }

    /// Probe every checked server once, concurrently, and report transitions.
    ///
    /// Servers already being checked, by the monitor or an earlier round,
    /// are skipped.
    pub async fn run_health_round(&self, probe: Arc<dyn Probe>) -> Vec<ProbeReport> {
        let mut tasks = JoinSet::new();
        for pool in self.backends.all().iter() {
            for server in pool.servers().iter().filter(|s| s.check_enabled()) {
                let Some(guard) = self.inflight.try_begin(pool.id(), server.id()) else {
                    tracing::debug!(backend = %pool.id(), server = %server.id(), "Check already in flight, skipping");
                    continue;
                };
                let probe = probe.clone();
                let backend = pool.id().to_string();
                let server = server.clone();
                let config = pool.health_check().clone();
                tasks.spawn(async move {
                    let _guard = guard;
                    check_server(probe.as_ref(), &backend, &server, &config)
                        .await
                        .map(|transition| ProbeReport {
                            backend,
                            server: server.id().to_string(),
                            transition,
                        })
                });
            }
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Health probe task failed"),
            }
        }
        reports
    }
}
