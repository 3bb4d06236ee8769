//! Configuration rendering.
//!
//! The engine exposes a read-only [`ConfigView`]; renderers turn it into
//! native configuration text. The text grammar belongs to the renderer.

pub mod haproxy;

use serde::Serialize;

use crate::config::{Algorithm, FrontendConfig, HealthCheckConfig, Mode};
use crate::health::state::HealthState;

pub use haproxy::HaproxyRenderer;

/// Point-in-time traversal of the routing model.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigView {
    pub frontend: FrontendConfig,
    /// ACL rules in evaluation order.
    pub acl_rules: Vec<AclRuleView>,
    pub default_backend: Option<String>,
    pub backends: Vec<BackendView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AclRuleView {
    pub name: String,
    /// Native expressions, all of which must hold.
    pub conditions: Vec<String>,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendView {
    pub id: String,
    pub algorithm: Algorithm,
    pub mode: Mode,
    pub health_check: HealthCheckConfig,
    pub servers: Vec<ServerView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerView {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub check: bool,
    pub state: HealthState,
}

/// Turns a [`ConfigView`] into configuration text.
pub trait ConfigRenderer {
    fn render(&self, view: &ConfigView) -> String;
}
