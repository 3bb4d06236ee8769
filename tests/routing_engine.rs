//! End-to-end routing through the engine.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use balancer::config::loader::parse_config;
use balancer::config::{AclConfig, AclRuleConfig, ServerConfig};
use balancer::health::AdminCommand;
use balancer::routing::RequestAttributes;
use balancer::stats::{StatsScope, StatsSnapshot};
use balancer::{LbError, RoutingEngine};

mod common;

fn pick(engine: &RoutingEngine, path: &str, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            let decision = engine.handle_request(&RequestAttributes::new(path)).unwrap();
            engine.record_request_end(&decision, 0, 0).unwrap();
            decision.server_id
        })
        .collect()
}

#[tokio::test]
async fn test_weighted_cycle_and_default_backend() {
    let engine = RoutingEngine::from_config(&common::two_backend_config()).unwrap();

    assert_eq!(pick(&engine, "/api/x", 10).concat(), "AAABCAAABC");
    assert_eq!(pick(&engine, "/", 4).concat(), "w1w2w1w2");
}

#[tokio::test]
async fn test_rule_order_first_match_wins() {
    let engine = RoutingEngine::from_config(&common::two_backend_config()).unwrap();
    engine.replace_rules(&AclConfig {
        rules: vec![
            AclRuleConfig::new("admin_host", "web").host("admin.example.com"),
            AclRuleConfig::new("is_api", "api").path_prefix("/api"),
        ],
        default_backend: None,
    });

    let req = RequestAttributes::new("/api/users").with_host("Admin.Example.com");
    assert_eq!(engine.handle_request(&req).unwrap().backend_id, "web");

    let req = RequestAttributes::new("/api/users").with_host("shop.example.com");
    assert_eq!(engine.handle_request(&req).unwrap().backend_id, "api");

    assert_eq!(
        engine.handle_request(&RequestAttributes::new("/static/app.js")),
        Err(LbError::NoRouteAvailable)
    );
}

#[tokio::test]
async fn test_drain_and_maintenance_remove_from_rotation() {
    let engine = RoutingEngine::from_config(&common::two_backend_config()).unwrap();
    let held = engine.handle_request(&RequestAttributes::new("/")).unwrap();
    assert_eq!(held.server_id, "w1");

    engine.set_server_state("web", "w1", AdminCommand::Drain).unwrap();
    assert!(pick(&engine, "/", 4).iter().all(|s| s == "w2"));

    // The draining server keeps its open session until it ends
    let StatsSnapshot::Server(w1) = engine
        .get_stats(&StatsScope::Server { backend: "web".into(), server: "w1".into() })
        .unwrap()
    else {
        panic!("expected server snapshot");
    };
    assert_eq!(w1.active_sessions, 1);
    engine.record_request_end(&held, 100, 200).unwrap();

    engine.set_server_state("web", "w2", AdminCommand::Maintenance).unwrap();
    assert_eq!(
        engine.handle_request(&RequestAttributes::new("/")),
        Err(LbError::NoHealthyServer("web".into()))
    );

    // Release goes back to DOWN, not straight to rotation
    engine.set_server_state("web", "w2", AdminCommand::Release).unwrap();
    assert_eq!(
        engine.handle_request(&RequestAttributes::new("/")),
        Err(LbError::NoHealthyServer("web".into()))
    );

    assert!(matches!(
        engine.set_server_state("web", "w1", AdminCommand::Release),
        Err(LbError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_stats_totals_after_traffic() {
    let engine = RoutingEngine::from_config(&common::two_backend_config()).unwrap();
    for _ in 0..5 {
        let d = engine.handle_request(&RequestAttributes::new("/api/orders")).unwrap();
        engine.record_request_end(&d, 10, 1000).unwrap();
    }

    let StatsSnapshot::Backend(api) = engine.get_stats(&StatsScope::Backend("api".into())).unwrap() else {
        panic!("expected backend snapshot");
    };
    assert_eq!(api.requests, 5);
    assert_eq!(api.total_sessions, 5);
    assert_eq!(api.active_sessions, 0);
    assert_eq!(api.bytes_in, 50);
    assert_eq!(api.bytes_out, 5000);
    assert_eq!(api.servers_up, 3);

    let StatsSnapshot::All { backends } = engine.get_stats(&StatsScope::All).unwrap() else {
        panic!("expected full snapshot");
    };
    assert_eq!(backends.len(), 2);
    assert_eq!(backends[1].requests, 0);

    assert!(matches!(
        engine.get_stats(&StatsScope::Backend("nope".into())),
        Err(LbError::BackendNotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_routing_keeps_counters_consistent() {
    let engine = Arc::new(RoutingEngine::from_config(&common::two_backend_config()).unwrap());
    let concurrency = 16;
    let requests_per_task = 50;

    let mut handles = Vec::new();
    for _ in 0..concurrency {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut seen = HashMap::new();
            for _ in 0..requests_per_task {
                let d = engine.handle_request(&RequestAttributes::new("/api/load")).unwrap();
                *seen.entry(d.server_id.clone()).or_insert(0u32) += 1;
                tokio::task::yield_now().await;
                engine.record_request_end(&d, 1, 1).unwrap();
            }
            seen
        }));
    }

    let mut totals: HashMap<String, u32> = HashMap::new();
    for handle in handles {
        for (server, n) in handle.await.unwrap() {
            *totals.entry(server).or_default() += n;
        }
    }

    // 800 picks over full 5-slot cycles keep the 3:1:1 ratio exactly
    assert_eq!(totals["A"], 480);
    assert_eq!(totals["B"], 160);
    assert_eq!(totals["C"], 160);

    let StatsSnapshot::Backend(api) = engine.get_stats(&StatsScope::Backend("api".into())).unwrap() else {
        panic!("expected backend snapshot");
    };
    assert_eq!(api.requests, 800);
    assert_eq!(api.active_sessions, 0);
}

#[tokio::test]
async fn test_runtime_membership_changes() {
    let engine = RoutingEngine::from_config(&common::two_backend_config()).unwrap();

    engine.remove_server("web", "w1").unwrap();
    assert!(pick(&engine, "/", 3).iter().all(|s| s == "w2"));

    engine
        .add_server("web", &ServerConfig::new("w3", "10.0.2.3", 8080).healthy())
        .unwrap();
    let picks = pick(&engine, "/", 4);
    assert!(picks.contains(&"w3".to_string()));

    engine.set_weight("web", "w3", 3).unwrap();
    assert!(matches!(
        engine.set_weight("web", "w3", 0),
        Err(LbError::InvalidWeight { .. })
    ));
}

#[tokio::test]
async fn test_source_hash_is_sticky() {
    let config = parse_config(
        r#"
        [acl]
        default_backend = "sticky"

        [[backends]]
        id = "sticky"
        algorithm = "source"

        [[backends.servers]]
        id = "s1"
        host = "10.0.0.1"
        port = 80
        seed_healthy = true

        [[backends.servers]]
        id = "s2"
        host = "10.0.0.2"
        port = 80
        seed_healthy = true

        [[backends.servers]]
        id = "s3"
        host = "10.0.0.3"
        port = 80
        seed_healthy = true
        "#,
    )
    .unwrap();
    let engine = RoutingEngine::from_config(&config).unwrap();

    let ip: IpAddr = "192.0.2.44".parse().unwrap();
    let req = RequestAttributes::new("/").with_src_ip(ip);
    let first = engine.handle_request(&req).unwrap().server_id;
    for _ in 0..10 {
        assert_eq!(engine.handle_request(&req).unwrap().server_id, first);
    }
}

#[tokio::test]
async fn test_generated_config_round_trip_of_model() {
    let engine = RoutingEngine::from_config(&common::two_backend_config()).unwrap();
    engine.set_server_state("api", "B", AdminCommand::Drain).unwrap();

    let text = engine.generate_config();
    assert!(text.contains("frontend main\n"));
    assert!(text.contains("    use_backend api if is_api\n"));
    assert!(text.contains("backend api\n    balance roundrobin\n"));
    assert!(text.contains("    server A 10.0.1.1:9000 weight 3 check"));
    assert!(text.contains("    server B 10.0.1.2:9000 weight 0 check"));
    assert!(text.find("backend api").unwrap() < text.find("backend web").unwrap());
}

#[tokio::test]
async fn test_demo_config_loads_and_routes() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/balancer.toml");
    let config = balancer::config::loader::load_config(&path).unwrap();
    let engine = RoutingEngine::from_config(&config).unwrap();

    let admin = RequestAttributes::new("/ops/reload").with_host("admin.example.com");
    assert_eq!(engine.handle_request(&admin).unwrap().backend_id, "ops");

    let beta = RequestAttributes::new("/home").with_header("x-beta", "1");
    assert_eq!(engine.handle_request(&beta).unwrap().backend_id, "api");

    assert_eq!(engine.handle_request(&RequestAttributes::new("/home")).unwrap().backend_id, "web");

    let text = engine.generate_config();
    assert!(text.contains("    server ops1 10.0.3.1:8443\n"));
    assert!(text.contains("    acl is_admin_1 hdr(host) -i admin.example.com\n"));
}
