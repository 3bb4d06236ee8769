//! Server entity.
//!
//! # Responsibilities
//! - Represent a single server inside a backend pool
//! - Hold the health state machine behind a per-server lock
//! - Track sessions, requests and bytes with per-field atomics
//!
//! Each server owns its own lock and counters, so two servers never contend.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::ServerConfig;
use crate::error::{LbError, Result};
use crate::health::state::{
    AdminCommand, HealthState, HealthStatus, ProbeOutcome, Thresholds, Transition,
};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// A single server in a backend pool.
#[derive(Debug)]
pub struct Server {
    id: String,
    /// Unique per constructed server; a re-added id gets a new one.
    instance: u64,
    host: String,
    port: u16,
    /// Probe this server at all.
    check: bool,
    weight: AtomicU32,

    health: Mutex<HealthStatus>,

    active_sessions: AtomicU64,
    total_requests: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    health_transitions: AtomicU64,
}

impl Server {
    /// Create a server in the given initial state.
    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        weight: u32,
        initial: HealthState,
    ) -> Result<Self> {
        let id = id.into();
        if weight < 1 {
            return Err(LbError::InvalidWeight { server: id, weight });
        }
        Ok(Self {
            id,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            host: host.into(),
            port,
            check: true,
            weight: AtomicU32::new(weight),
            health: Mutex::new(HealthStatus::new(initial)),
            active_sessions: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            health_transitions: AtomicU64::new(0),
        })
    }

    /// Build a server from its configuration entry.
    ///
    /// Servers start Down unless `seed_healthy` is set.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        if config.port == 0 {
            return Err(LbError::InvalidConfig(format!("server '{}' has port 0", config.id)));
        }
        let initial = if config.seed_healthy {
            HealthState::Up
        } else {
            HealthState::Down
        };
        let mut server = Self::new(&config.id, &config.host, config.port, config.weight, initial)?;
        server.check = config.check;
        Ok(server)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form used for probing and rendering.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn check_enabled(&self) -> bool {
        self.check
    }

    pub fn weight(&self) -> u32 {
        self.weight.load(Ordering::Relaxed)
    }

    /// Change the weight. Selection picks it up at the next credit refill.
    pub fn set_weight(&self, weight: u32) -> Result<()> {
        if weight < 1 {
            return Err(LbError::InvalidWeight {
                server: self.id.clone(),
                weight,
            });
        }
        self.weight.store(weight, Ordering::Relaxed);
        Ok(())
    }

    // --- Health ---

    fn health_lock(&self) -> MutexGuard<'_, HealthStatus> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point-in-time copy of the health record.
    pub fn health(&self) -> HealthStatus {
        *self.health_lock()
    }

    pub fn state(&self) -> HealthState {
        self.health_lock().state()
    }

    /// True if the server may receive new requests.
    pub fn is_eligible(&self) -> bool {
        self.state().accepts_new_traffic()
    }

    /// Feed a probe outcome into the state machine.
    pub fn observe_probe(&self, outcome: ProbeOutcome, thresholds: Thresholds) -> Option<Transition> {
        let transition = self.health_lock().observe(outcome, thresholds);
        if transition.is_some() {
            self.health_transitions.fetch_add(1, Ordering::Relaxed);
        }
        transition
    }

    /// Apply an operator command to the state machine.
    pub fn administer(&self, command: AdminCommand) -> Result<Option<Transition>> {
        let transition = self
            .health_lock()
            .administer(command)
            .map_err(|illegal| LbError::InvalidTransition {
                server: self.id.clone(),
                from: illegal.from,
                to: illegal.to,
            })?;
        if transition.is_some() {
            self.health_transitions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(transition)
    }

    // --- Traffic counters ---

    /// A request was routed here.
    pub fn begin_request(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A request routed here has finished.
    ///
    /// Pairing with [`Server::begin_request`] is the caller's contract. An
    /// unmatched end is not reported; the session count stops at zero.
    pub fn end_request(&self, bytes_in: u64, bytes_out: u64) {
        let _ = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
        self.bytes_in.fetch_add(bytes_in, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes_out, Ordering::Relaxed);
    }

    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }

    pub fn health_transitions(&self) -> u64 {
        self.health_transitions.load(Ordering::Relaxed)
    }
}
