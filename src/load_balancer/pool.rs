//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the ordered server list of one backend
//! - Apply the backend's algorithm to select among eligible servers
//! - Register pools by id for lookup from the routing engine
//!
//! Structural changes (add/remove) build a new list and swap it in, so a
//! concurrent selection sees the list from before or after, never a mix.

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::validation::validate_health_check;
use crate::config::{Algorithm, BackendConfig, HealthCheckConfig, Mode};
use crate::error::{LbError, Result};
use crate::load_balancer::{for_algorithm, server::Server, LoadBalancer};
use crate::routing::RequestAttributes;

fn lock(m: &Mutex<()>) -> MutexGuard<'_, ()> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A named pool of servers.
#[derive(Debug)]
pub struct BackendPool {
    id: String,
    algorithm: Algorithm,
    mode: Mode,
    health_check: HealthCheckConfig,
    servers: ArcSwap<Vec<Arc<Server>>>,
    /// Serializes structural mutation; readers never take it.
    writer: Mutex<()>,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendPool {
    /// Create an empty pool.
    pub fn new(
        id: impl Into<String>,
        algorithm: Algorithm,
        mode: Mode,
        health_check: HealthCheckConfig,
    ) -> Self {
        Self {
            id: id.into(),
            algorithm,
            mode,
            health_check,
            servers: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
            balancer: for_algorithm(algorithm),
        }
    }

    /// Build a pool and its servers from configuration.
    ///
    /// The health check block is checked here as well as at load time, since
    /// backends added at runtime never pass through `validate_config`.
    pub fn from_config(config: &BackendConfig, default_health: &HealthCheckConfig) -> Result<Self> {
        let health_check = config.health_check.clone().unwrap_or_else(|| default_health.clone());
        validate_health_check(&health_check, &config.id).map_err(|errors| {
            let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
            LbError::InvalidConfig(reasons.join(", "))
        })?;
        let pool = Self::new(&config.id, config.algorithm, config.mode, health_check);
        for server in &config.servers {
            pool.add_server(Server::from_config(server)?)?;
        }
        Ok(pool)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn health_check(&self) -> &HealthCheckConfig {
        &self.health_check
    }

    /// Point-in-time server list in pool order.
    pub fn servers(&self) -> Arc<Vec<Arc<Server>>> {
        self.servers.load_full()
    }

    pub fn server(&self, id: &str) -> Result<Arc<Server>> {
        self.servers
            .load()
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| LbError::NotFound(format!("{}/{}", self.id, id)))
    }

    /// Append a server. Fails if the id is already present.
    pub fn add_server(&self, server: Server) -> Result<Arc<Server>> {
        let _guard = lock(&self.writer);
        let current = self.servers.load();
        if current.iter().any(|s| s.id() == server.id()) {
            return Err(LbError::DuplicateId(format!("{}/{}", self.id, server.id())));
        }

        let server = Arc::new(server);
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(server.clone());
        self.servers.store(Arc::new(next));

        tracing::info!(
            backend = %self.id,
            server = %server.id(),
            address = %server.address(),
            weight = server.weight(),
            state = %server.state(),
            "Server added"
        );
        Ok(server)
    }

    /// Remove a server. Selections already holding a snapshot finish against it.
    pub fn remove_server(&self, id: &str) -> Result<Arc<Server>> {
        let _guard = lock(&self.writer);
        let current = self.servers.load();
        let position = current
            .iter()
            .position(|s| s.id() == id)
            .ok_or_else(|| LbError::NotFound(format!("{}/{}", self.id, id)))?;

        let mut next: Vec<Arc<Server>> = current.iter().cloned().collect();
        let removed = next.remove(position);
        self.servers.store(Arc::new(next));

        tracing::info!(backend = %self.id, server = %id, "Server removed");
        Ok(removed)
    }

    /// Change a server's weight. Round-robin applies it at the next refill.
    pub fn set_weight(&self, id: &str, weight: u32) -> Result<()> {
        let server = self.server(id)?;
        server.set_weight(weight)?;
        tracing::info!(backend = %self.id, server = %id, weight, "Server weight changed");
        Ok(())
    }

    /// Servers that may take new requests, in pool order.
    pub fn list_eligible(&self) -> Vec<Arc<Server>> {
        self.servers
            .load()
            .iter()
            .filter(|s| s.is_eligible())
            .cloned()
            .collect()
    }

    /// Pick a server for a new request.
    pub fn select_server(&self, req: &RequestAttributes) -> Result<Arc<Server>> {
        let eligible = self.list_eligible();
        if eligible.is_empty() {
            tracing::debug!(
                backend = %self.id,
                servers = self.servers.load().len(),
                "No healthy servers in backend"
            );
            return Err(LbError::NoHealthyServer(self.id.clone()));
        }

        self.balancer
            .next_server(&eligible, req)
            .ok_or_else(|| LbError::NoHealthyServer(self.id.clone()))
    }
}

/// Registry of backend pools by id, in declaration order.
#[derive(Debug)]
pub struct BackendManager {
    pools: ArcSwap<Vec<Arc<BackendPool>>>,
    writer: Mutex<()>,
}

impl BackendManager {
    /// Create the registry from configuration.
    pub fn new(configs: &[BackendConfig], default_health: &HealthCheckConfig) -> Result<Self> {
        let manager = Self {
            pools: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
        };
        for config in configs {
            manager.add_backend(BackendPool::from_config(config, default_health)?)?;
        }
        Ok(manager)
    }

    /// Look up a pool.
    pub fn get(&self, id: &str) -> Result<Arc<BackendPool>> {
        self.pools
            .load()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| LbError::BackendNotFound(id.to_string()))
    }

    /// Register a pool. Fails if the id is taken.
    pub fn add_backend(&self, pool: BackendPool) -> Result<Arc<BackendPool>> {
        let _guard = lock(&self.writer);
        let current = self.pools.load();
        if current.iter().any(|p| p.id() == pool.id()) {
            return Err(LbError::DuplicateId(pool.id().to_string()));
        }

        let pool = Arc::new(pool);
        let mut next: Vec<Arc<BackendPool>> = current.iter().cloned().collect();
        next.push(pool.clone());
        self.pools.store(Arc::new(next));

        tracing::info!(
            backend = %pool.id(),
            algorithm = %pool.algorithm(),
            servers = pool.servers().len(),
            "Backend registered"
        );
        Ok(pool)
    }

    /// All pools in declaration order.
    pub fn all(&self) -> Arc<Vec<Arc<BackendPool>>> {
        self.pools.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::health::state::HealthState;

    fn pool() -> BackendPool {
        BackendPool::new("web", Algorithm::RoundRobin, Mode::Http, HealthCheckConfig::default())
    }

    fn up(id: &str, weight: u32) -> Server {
        Server::new(id, "10.0.0.1", 80, weight, HealthState::Up).unwrap()
    }

    #[test]
    fn test_duplicate_add_leaves_pool_unchanged() {
        let pool = pool();
        pool.add_server(up("s1", 1)).unwrap();
        pool.add_server(up("s2", 2)).unwrap();

        let err = pool.add_server(up("s1", 9)).unwrap_err();
        assert_eq!(err, LbError::DuplicateId("web/s1".into()));

        let servers = pool.servers();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].weight(), 1);
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let pool = pool();
        assert!(matches!(pool.remove_server("ghost"), Err(LbError::NotFound(_))));
    }

    #[test]
    fn test_remove_only_eligible_then_select() {
        let pool = pool();
        pool.add_server(up("s1", 1)).unwrap();
        pool.add_server(Server::new("s2", "10.0.0.2", 80, 1, HealthState::Down).unwrap())
            .unwrap();

        let req = RequestAttributes::default();
        assert_eq!(pool.select_server(&req).unwrap().id(), "s1");

        pool.remove_server("s1").unwrap();
        assert_eq!(pool.select_server(&req).unwrap_err(), LbError::NoHealthyServer("web".into()));
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let pool = pool();
        pool.add_server(up("s1", 1)).unwrap();
        pool.add_server(up("s2", 1)).unwrap();

        let snapshot = pool.servers();
        pool.remove_server("s1").unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(pool.servers().len(), 1);
    }

    #[test]
    fn test_list_eligible_excludes_draining_and_maintenance() {
        use crate::health::state::AdminCommand;

        let pool = pool();
        pool.add_server(up("a", 1)).unwrap();
        pool.add_server(up("b", 1)).unwrap();
        pool.add_server(up("c", 1)).unwrap();
        pool.add_server(Server::new("d", "10.0.0.4", 80, 1, HealthState::Down).unwrap())
            .unwrap();

        pool.server("b").unwrap().administer(AdminCommand::Drain).unwrap();
        pool.server("c").unwrap().administer(AdminCommand::Maintenance).unwrap();

        let ids: Vec<_> = pool.list_eligible().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, ["a"]);
    }

    #[test]
    fn test_set_weight_validation() {
        let pool = pool();
        pool.add_server(up("s1", 1)).unwrap();
        assert!(matches!(pool.set_weight("s1", 0), Err(LbError::InvalidWeight { .. })));
        assert!(matches!(pool.set_weight("nope", 2), Err(LbError::NotFound(_))));
        pool.set_weight("s1", 4).unwrap();
        assert_eq!(pool.server("s1").unwrap().weight(), 4);
    }

    #[test]
    fn test_manager_from_config() {
        let mut web = BackendConfig::new("web");
        web.servers.push(ServerConfig::new("w1", "10.0.0.1", 80).healthy());
        let api = BackendConfig::new("api");

        let manager = BackendManager::new(&[web, api], &HealthCheckConfig::default()).unwrap();
        assert_eq!(manager.all().len(), 2);
        assert_eq!(manager.get("web").unwrap().servers()[0].state(), HealthState::Up);
        assert_eq!(
            manager.get("nope").unwrap_err(),
            LbError::BackendNotFound("nope".into())
        );
        assert!(matches!(
            manager.add_backend(BackendPool::new("api", Algorithm::First, Mode::Tcp, HealthCheckConfig::default())),
            Err(LbError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_zero_interval() {
        let mut late = BackendConfig::new("late");
        late.health_check = Some(HealthCheckConfig {
            interval_ms: 0,
            ..HealthCheckConfig::default()
        });
        late.servers.push(ServerConfig::new("l1", "10.0.9.1", 80));

        assert_eq!(
            BackendPool::from_config(&late, &HealthCheckConfig::default()).unwrap_err(),
            LbError::InvalidConfig("health check for 'late': interval must be > 0".into())
        );
    }

    #[test]
    fn test_readded_server_waits_for_refill() {
        let pool = pool();
        pool.add_server(up("a", 3)).unwrap();
        pool.add_server(up("b", 3)).unwrap();

        let req = RequestAttributes::default();
        assert_eq!(pool.select_server(&req).unwrap().id(), "a");

        // Same id, new server: the old b's credit must not carry over
        pool.remove_server("b").unwrap();
        pool.add_server(up("b", 3)).unwrap();

        let picks: Vec<String> = (0..3)
            .map(|_| pool.select_server(&req).unwrap().id().to_string())
            .collect();
        assert_eq!(picks, ["a", "a", "a"]);
        assert_eq!(pool.select_server(&req).unwrap().id(), "b");
    }
}
