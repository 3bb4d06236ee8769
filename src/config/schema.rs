//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::health::state::Thresholds;

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Frontend listener description (rendered, never bound).
    pub frontend: FrontendConfig,

    /// Backend pools with their servers.
    pub backends: Vec<BackendConfig>,

    /// Ordered ACL rules and the default backend.
    pub acl: AclConfig,

    /// Health check settings used by backends without their own.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Proxy mode of a frontend or backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Http,
    Tcp,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Http => f.write_str("http"),
            Mode::Tcp => f.write_str("tcp"),
        }
    }
}

/// Frontend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Frontend name in rendered output.
    pub name: String,

    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    pub mode: Mode,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            bind_address: "0.0.0.0:80".to_string(),
            mode: Mode::Http,
        }
    }
}

/// Server selection algorithm of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Weighted round-robin with credit refill.
    #[default]
    RoundRobin,
    /// Fewest active sessions.
    LeastConn,
    /// First eligible server in pool order.
    First,
    /// Weight-proportional random.
    Random,
    /// Hash of the source address.
    Source,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::RoundRobin => "roundrobin",
            Algorithm::LeastConn => "leastconn",
            Algorithm::First => "first",
            Algorithm::Random => "random",
            Algorithm::Source => "source",
        };
        f.write_str(name)
    }
}

/// Backend pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub id: String,

    #[serde(default)]
    pub algorithm: Algorithm,

    #[serde(default)]
    pub mode: Mode,

    /// Overrides the top-level health check settings.
    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,

    /// Servers in insertion order.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl BackendConfig {
    /// A round-robin backend with no servers.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            algorithm: Algorithm::default(),
            mode: Mode::default(),
            health_check: None,
            servers: Vec::new(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Identifier, unique within its backend.
    pub id: String,

    pub host: String,

    pub port: u16,

    /// Weight for weighted load balancing (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Run health probes against this server.
    #[serde(default = "default_check")]
    pub check: bool,

    /// Start Up instead of Down.
    #[serde(default)]
    pub seed_healthy: bool,
}

impl ServerConfig {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            weight: default_weight(),
            check: default_check(),
            seed_healthy: false,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn healthy(mut self) -> Self {
        self.seed_healthy = true;
        self
    }
}

fn default_weight() -> u32 {
    1
}

fn default_check() -> bool {
    true
}

/// ACL table configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AclConfig {
    /// Rules in evaluation order.
    pub rules: Vec<AclRuleConfig>,

    /// Backend for requests no rule matches.
    pub default_backend: Option<String>,
}

/// A single ACL rule. All present conditions must match (AND).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AclRuleConfig {
    /// Rule name, used in logs and rendered output.
    pub name: String,

    /// Host header to match (case-insensitive).
    #[serde(default)]
    pub host: Option<String>,

    /// Path prefix to match.
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Header value to match.
    #[serde(default)]
    pub header: Option<HeaderCondition>,

    /// Backend to use when the rule matches.
    pub backend: String,
}

impl AclRuleConfig {
    pub fn new(name: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
            path_prefix: None,
            header: None,
            backend: backend.into(),
        }
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header = Some(HeaderCondition {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Header name/value pair for ACL matching.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderCondition {
    pub name: String,
    pub value: String,
}

/// Health check configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Consecutive successes before a Down server goes Up.
    pub rise: u32,

    /// Consecutive failures before an Up server goes Down.
    pub fall: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2000,
            timeout_ms: 1000,
            rise: 2,
            fall: 3,
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            rise: self.rise,
            fall: self.fall,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
