//! ACL table lookup.
//!
//! # Responsibilities
//! - Store compiled ACL rules in declared order
//! - Resolve a request to a backend id: first match wins, then default
//! - Swap the whole table atomically on rule replacement
//!
//! # Design Decisions
//! - Lookups load an immutable snapshot (no lock on the request path)
//! - O(n) scan in declared order (acceptable for typical rule counts)
//! - Explicit NoRouteAvailable rather than a silent fallback

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::config::{AclConfig, AclRuleConfig};
use crate::error::{LbError, Result};
use crate::routing::matcher::{self, Matcher};
use crate::routing::request::RequestAttributes;

/// A compiled ACL rule.
#[derive(Debug)]
pub struct AclRule {
    pub name: String,
    pub matcher: Box<dyn Matcher>,
    pub backend: String,
    /// The rule as configured, kept for traversal.
    pub source: AclRuleConfig,
}

impl AclRule {
    pub fn compile(config: &AclRuleConfig) -> Self {
        Self {
            name: config.name.clone(),
            matcher: matcher::compile(config),
            backend: config.backend.clone(),
            source: config.clone(),
        }
    }
}

/// Immutable rule table.
#[derive(Debug, Default)]
pub struct AclTable {
    pub rules: Vec<AclRule>,
    pub default_backend: Option<String>,
}

impl AclTable {
    pub fn compile(config: &AclConfig) -> Self {
        Self {
            rules: config.rules.iter().map(AclRule::compile).collect(),
            default_backend: config.default_backend.clone(),
        }
    }
}

/// Maps request attributes to a backend id.
#[derive(Debug)]
pub struct AclRouter {
    table: ArcSwap<AclTable>,
}

impl AclRouter {
    pub fn from_config(config: &AclConfig) -> Self {
        Self {
            table: ArcSwap::from_pointee(AclTable::compile(config)),
        }
    }

    /// Resolve the backend for a request.
    pub fn route(&self, req: &RequestAttributes) -> Result<String> {
        let table = self.table.load();

        if let Some(rule) = table.rules.iter().find(|r| r.matcher.matches(req)) {
            tracing::trace!(rule = %rule.name, backend = %rule.backend, "ACL matched");
            return Ok(rule.backend.clone());
        }

        table.default_backend.clone().ok_or(LbError::NoRouteAvailable)
    }

    /// Replace the whole table. Concurrent lookups see the old or the new one.
    pub fn replace(&self, config: &AclConfig) {
        self.table.store(Arc::new(AclTable::compile(config)));
        tracing::info!(
            rules = config.rules.len(),
            default_backend = ?config.default_backend,
            "ACL rules replaced"
        );
    }

    /// Current table, for traversal.
    pub fn snapshot(&self) -> Arc<AclTable> {
        self.table.load_full()
    }

    /// Current rules and default backend in configuration form.
    pub fn to_config(&self) -> AclConfig {
        let table = self.table.load();
        AclConfig {
            rules: table.rules.iter().map(|r| r.source.clone()).collect(),
            default_backend: table.default_backend.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_then_default() -> AclConfig {
        AclConfig {
            rules: vec![AclRuleConfig::new("is_api", "b1").path_prefix("/api")],
            default_backend: Some("b2".into()),
        }
    }

    #[test]
    fn test_first_match_then_default() {
        let router = AclRouter::from_config(&api_then_default());

        assert_eq!(router.route(&RequestAttributes::new("/api")).unwrap(), "b1");
        assert_eq!(router.route(&RequestAttributes::new("/api/users")).unwrap(), "b1");
        assert_eq!(router.route(&RequestAttributes::new("/static/app.js")).unwrap(), "b2");
        assert_eq!(router.route(&RequestAttributes::new("/")).unwrap(), "b2");
    }

    #[test]
    fn test_declared_order_wins() {
        let router = AclRouter::from_config(&AclConfig {
            rules: vec![
                AclRuleConfig::new("tenant", "tenant").header("x-tenant", "acme"),
                AclRuleConfig::new("api", "api").path_prefix("/api"),
            ],
            default_backend: None,
        });

        let req = RequestAttributes::new("/api/v1").with_header("X-Tenant", "acme");
        assert_eq!(router.route(&req).unwrap(), "tenant");

        let req = RequestAttributes::new("/api/v1");
        assert_eq!(router.route(&req).unwrap(), "api");
    }

    #[test]
    fn test_no_route_without_default() {
        let router = AclRouter::from_config(&AclConfig {
            rules: vec![AclRuleConfig::new("h", "web").host("www.example.com")],
            default_backend: None,
        });

        let err = router.route(&RequestAttributes::new("/").with_host("other.example.com"));
        assert_eq!(err, Err(LbError::NoRouteAvailable));
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let router = AclRouter::from_config(&api_then_default());
        let req = RequestAttributes::new("/api/x");
        for _ in 0..100 {
            assert_eq!(router.route(&req).unwrap(), "b1");
        }
    }

    #[test]
    fn test_replace_rules() {
        let router = AclRouter::from_config(&api_then_default());
        router.replace(&AclConfig {
            rules: vec![AclRuleConfig::new("img", "images").path_prefix("/img")],
            default_backend: None,
        });

        assert_eq!(router.route(&RequestAttributes::new("/img/a.png")).unwrap(), "images");
        assert_eq!(
            router.route(&RequestAttributes::new("/api")),
            Err(LbError::NoRouteAvailable)
        );
        assert_eq!(router.to_config().rules[0].name, "img");
    }
}
