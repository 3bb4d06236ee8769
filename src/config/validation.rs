//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (ACL rules reference existing backends)
//! - Validate value ranges (weights, ports, thresholds, durations)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::{BalancerConfig, HealthCheckConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate backend id '{0}'")]
    DuplicateBackend(String),

    #[error("duplicate server id '{server}' in backend '{backend}'")]
    DuplicateServer { backend: String, server: String },

    #[error("server '{server}' in backend '{backend}' has weight 0")]
    ZeroWeight { backend: String, server: String },

    #[error("server '{server}' in backend '{backend}' has port 0")]
    ZeroPort { backend: String, server: String },

    #[error("health check for '{scope}': {reason}")]
    HealthCheck { scope: String, reason: &'static str },

    #[error("acl rule '{rule}' targets unknown backend '{backend}'")]
    UnknownRuleBackend { rule: String, backend: String },

    #[error("default backend '{0}' does not exist")]
    UnknownDefaultBackend(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut backend_ids = HashSet::new();

    check_health(&config.health_check, "defaults", &mut errors);

    for backend in &config.backends {
        if !backend_ids.insert(backend.id.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.id.clone()));
        }

        if let Some(hc) = &backend.health_check {
            check_health(hc, &backend.id, &mut errors);
        }

        let mut server_ids = HashSet::new();
        for server in &backend.servers {
            if !server_ids.insert(server.id.as_str()) {
                errors.push(ValidationError::DuplicateServer {
                    backend: backend.id.clone(),
                    server: server.id.clone(),
                });
            }
            if server.weight == 0 {
                errors.push(ValidationError::ZeroWeight {
                    backend: backend.id.clone(),
                    server: server.id.clone(),
                });
            }
            if server.port == 0 {
                errors.push(ValidationError::ZeroPort {
                    backend: backend.id.clone(),
                    server: server.id.clone(),
                });
            }
        }
    }

    for rule in &config.acl.rules {
        if !backend_ids.contains(rule.backend.as_str()) {
            errors.push(ValidationError::UnknownRuleBackend {
                rule: rule.name.clone(),
                backend: rule.backend.clone(),
            });
        }
    }

    if let Some(default) = &config.acl.default_backend {
        if !backend_ids.contains(default.as_str()) {
            errors.push(ValidationError::UnknownDefaultBackend(default.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one health check block on its own, for backends added at runtime.
pub fn validate_health_check(hc: &HealthCheckConfig, scope: &str) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_health(hc, scope, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_health(hc: &HealthCheckConfig, scope: &str, errors: &mut Vec<ValidationError>) {
    let mut push = |reason| {
        errors.push(ValidationError::HealthCheck {
            scope: scope.to_string(),
            reason,
        })
    };
    if hc.interval_ms == 0 {
        push("interval must be > 0");
    }
    if hc.timeout_ms == 0 {
        push("timeout must be > 0");
    }
    if hc.rise == 0 {
        push("rise must be >= 1");
    }
    if hc.fall == 0 {
        push("fall must be >= 1");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AclRuleConfig, BackendConfig, ServerConfig};

    #[test]
    fn test_valid_config() {
        let mut config = BalancerConfig::default();
        let mut web = BackendConfig::new("web");
        web.servers.push(ServerConfig::new("w1", "10.0.0.1", 80));
        config.backends.push(web);
        config.acl.rules.push(AclRuleConfig::new("all", "web").path_prefix("/"));
        config.acl.default_backend = Some("web".into());

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = BalancerConfig::default();
        config.health_check.rise = 0;

        let mut web = BackendConfig::new("web");
        web.servers.push(ServerConfig::new("w1", "10.0.0.1", 80));
        web.servers.push(ServerConfig::new("w1", "10.0.0.2", 0).with_weight(0));
        config.backends.push(web);
        config.backends.push(BackendConfig::new("web"));

        config.acl.rules.push(AclRuleConfig::new("dangling", "nope").host("a.example"));
        config.acl.default_backend = Some("missing".into());

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateBackend("web".into())));
        assert!(errors.contains(&ValidationError::DuplicateServer {
            backend: "web".into(),
            server: "w1".into()
        }));
        assert!(errors.contains(&ValidationError::ZeroWeight {
            backend: "web".into(),
            server: "w1".into()
        }));
        assert!(errors.contains(&ValidationError::ZeroPort {
            backend: "web".into(),
            server: "w1".into()
        }));
        assert!(errors.contains(&ValidationError::UnknownRuleBackend {
            rule: "dangling".into(),
            backend: "nope".into()
        }));
        assert!(errors.contains(&ValidationError::UnknownDefaultBackend("missing".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::HealthCheck { scope, .. } if scope == "defaults")));
    }

    #[test]
    fn test_single_health_check_block() {
        assert!(validate_health_check(&HealthCheckConfig::default(), "web").is_ok());

        let hc = HealthCheckConfig {
            interval_ms: 0,
            fall: 0,
            ..HealthCheckConfig::default()
        };
        let errors = validate_health_check(&hc, "late").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "health check for 'late': interval must be > 0");
    }
}
