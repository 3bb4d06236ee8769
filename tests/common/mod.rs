//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use balancer::config::{AclRuleConfig, BackendConfig, BalancerConfig, HealthCheckConfig, ServerConfig};
use tokio::net::TcpListener;

/// Start a TCP listener that accepts and immediately drops connections.
/// Abort the returned handle to take the "backend" down.
#[allow(dead_code)]
pub async fn start_tcp_backend() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => drop(socket),
                Err(_) => break,
            }
        }
    });
    (addr, handle)
}

/// Fast checks for tests: 20ms interval, 50ms timeout, rise 2, fall 2.
#[allow(dead_code)]
pub fn fast_checks() -> HealthCheckConfig {
    HealthCheckConfig {
        enabled: true,
        interval_ms: 20,
        timeout_ms: 50,
        rise: 2,
        fall: 2,
    }
}

/// `api` (3:1:1 weighted) behind `/api`, `web` as default.
#[allow(dead_code)]
pub fn two_backend_config() -> BalancerConfig {
    let mut config = BalancerConfig::default();

    let mut api = BackendConfig::new("api");
    api.servers = vec![
        ServerConfig::new("A", "10.0.1.1", 9000).with_weight(3).healthy(),
        ServerConfig::new("B", "10.0.1.2", 9000).healthy(),
        ServerConfig::new("C", "10.0.1.3", 9000).healthy(),
    ];

    let mut web = BackendConfig::new("web");
    web.servers = vec![
        ServerConfig::new("w1", "10.0.2.1", 8080).healthy(),
        ServerConfig::new("w2", "10.0.2.2", 8080).healthy(),
    ];

    config.backends = vec![api, web];
    config.acl.rules = vec![AclRuleConfig::new("is_api", "api").path_prefix("/api")];
    config.acl.default_backend = Some("web".into());
    config
}

/// Poll `check` every 10ms until it holds or `deadline` passes.
#[allow(dead_code)]
pub async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
