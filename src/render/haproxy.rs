//! HAProxy configuration text.

use std::fmt::Write;

use crate::health::state::HealthState;
use crate::render::{AclRuleView, BackendView, ConfigRenderer, ConfigView, ServerView};

const GLOBAL: &[&str] = &[
    "global",
    "    log stdout local0",
    "    log stdout local1 notice",
    "    chroot /var/lib/haproxy",
    "    stats socket /run/haproxy/admin.sock mode 660 level admin",
];

/// Renders `global`, `frontend` and `backend` sections.
#[derive(Debug, Default, Clone, Copy)]
pub struct HaproxyRenderer;

impl ConfigRenderer for HaproxyRenderer {
    fn render(&self, view: &ConfigView) -> String {
        let mut out = String::new();
        for line in GLOBAL {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');

        let frontend = &view.frontend;
        let _ = writeln!(out, "frontend {}", frontend.name);
        let _ = writeln!(out, "    bind {}", frontend.bind_address);
        let _ = writeln!(out, "    mode {}", frontend.mode);
        for rule in &view.acl_rules {
            render_rule(&mut out, rule);
        }
        if let Some(default) = &view.default_backend {
            let _ = writeln!(out, "    default_backend {}", default);
        }
        out.push('\n');

        for backend in &view.backends {
            render_backend(&mut out, backend);
            out.push('\n');
        }
        out
    }
}

fn render_rule(out: &mut String, rule: &AclRuleView) {
    match rule.conditions.as_slice() {
        [] => {
            let _ = writeln!(out, "    use_backend {} if TRUE", rule.backend);
        }
        [single] => {
            let _ = writeln!(out, "    acl {} {}", rule.name, single);
            let _ = writeln!(out, "    use_backend {} if {}", rule.backend, rule.name);
        }
        many => {
            let names: Vec<String> = (1..=many.len()).map(|i| format!("{}_{}", rule.name, i)).collect();
            for (name, condition) in names.iter().zip(many) {
                let _ = writeln!(out, "    acl {} {}", name, condition);
            }
            let _ = writeln!(out, "    use_backend {} if {}", rule.backend, names.join(" "));
        }
    }
}

fn render_backend(out: &mut String, backend: &BackendView) {
    let _ = writeln!(out, "backend {}", backend.id);
    let _ = writeln!(out, "    balance {}", backend.algorithm);
    let _ = writeln!(out, "    mode {}", backend.mode);
    if backend.health_check.enabled {
        let _ = writeln!(out, "    timeout check {}ms", backend.health_check.timeout_ms);
    }
    for server in &backend.servers {
        let _ = writeln!(out, "    {}", server_line(backend, server));
    }
}

fn server_line(backend: &BackendView, server: &ServerView) -> String {
    let mut line = format!("server {} {}:{}", server.id, server.host, server.port);
    match server.state {
        // Draining keeps sessions but takes no new ones
        HealthState::Draining => line.push_str(" weight 0"),
        _ if server.weight != 1 => {
            let _ = write!(line, " weight {}", server.weight);
        }
        _ => {}
    }
    if server.check && backend.health_check.enabled {
        let hc = &backend.health_check;
        let _ = write!(line, " check inter {} rise {} fall {}", hc.interval_ms, hc.rise, hc.fall);
    }
    if server.state == HealthState::Maintenance {
        line.push_str(" disabled");
    }
    line
}
