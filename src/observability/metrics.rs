//! Metrics emission.
//!
//! # Metrics
//! - `lb_requests_total` (counter): routed requests by backend, server
//! - `lb_route_failures_total` (counter): routing failures by reason
//! - `lb_health_transitions_total` (counter): state changes by backend, server, to
//! - `lb_server_up` (gauge): 1=accepting traffic, 0=not
//!
//! Emission goes through the `metrics` facade; with no recorder installed
//! every call is a no-op.

use crate::error::LbError;
use crate::health::state::HealthState;

pub fn record_request(backend: &str, server: &str) {
    metrics::counter!(
        "lb_requests_total",
        "backend" => backend.to_string(),
        "server" => server.to_string()
    )
    .increment(1);
}

pub fn record_route_failure(error: &LbError) {
    let reason = match error {
        LbError::NoRouteAvailable => "no_route",
        LbError::BackendNotFound(_) => "backend_not_found",
        LbError::NoHealthyServer(_) => "no_healthy_server",
        _ => "other",
    };
    metrics::counter!("lb_route_failures_total", "reason" => reason).increment(1);
}

pub fn record_health_transition(backend: &str, server: &str, to: HealthState) {
    metrics::counter!(
        "lb_health_transitions_total",
        "backend" => backend.to_string(),
        "server" => server.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    record_server_state(backend, server, to);
}

pub fn record_server_state(backend: &str, server: &str, state: HealthState) {
    let value = if state.accepts_new_traffic() { 1.0 } else { 0.0 };
    metrics::gauge!(
        "lb_server_up",
        "backend" => backend.to_string(),
        "server" => server.to_string()
    )
    .set(value);
}
