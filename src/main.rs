//! `lbctl`: drive the routing engine from the command line.
//!
//! Loads a TOML configuration (or starts empty), then inspects the model,
//! simulates routing decisions, renders HAProxy configuration, or runs the
//! health monitor until interrupted.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use balancer::config::loader::load_config;
use balancer::config::{BalancerConfig, ServerConfig};
use balancer::health::{Probe, TcpConnectProbe};
use balancer::observability::logging;
use balancer::routing::RequestAttributes;
use balancer::stats::StatsScope;
use balancer::{RoutingEngine, Shutdown};

#[derive(Parser)]
#[command(name = "lbctl")]
#[command(about = "Routing and health engine for a load balancer", long_about = None)]
struct Cli {
    /// TOML configuration file. Without it the engine starts empty.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List backends with server counts
    Backends,
    /// Print the ACL rules in evaluation order
    Rules,
    /// Print the rendered HAProxy configuration
    GenerateConfig {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print statistics for everything, a backend, or one server
    Stats {
        backend: Option<String>,
        #[arg(long, requires = "backend")]
        server: Option<String>,
    },
    /// Route synthetic requests and print the decisions
    Simulate {
        #[arg(long)]
        host: Option<String>,
        #[arg(long, default_value = "/")]
        path: String,
        #[arg(long)]
        src_ip: Option<IpAddr>,
        /// Request header as name=value; repeatable
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Add a server, then print the backend list
    AddServer {
        backend: String,
        id: String,
        host: String,
        port: u16,
        #[arg(long, default_value_t = 1)]
        weight: u32,
    },
    /// Probe every server over TCP for a number of rounds
    Check {
        #[arg(long, default_value_t = 1)]
        rounds: u32,
    },
    /// Run the health monitor until Ctrl-C, logging stats periodically
    Run {
        #[arg(long, default_value_t = 10)]
        stats_interval_secs: u64,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct SimulatedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init(&log_level);

    let engine = RoutingEngine::from_config(&config)?;

    match cli.command {
        Commands::Backends => print_json(&engine.list_backends())?,
        Commands::Rules => print_json(&engine.rules())?,
        Commands::GenerateConfig { output } => {
            let text = engine.generate_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    tracing::info!(path = %path.display(), "Configuration written");
                }
                None => print!("{}", text),
            }
        }
        Commands::Stats { backend, server } => {
            let scope = match (backend, server) {
                (Some(backend), Some(server)) => StatsScope::Server { backend, server },
                (Some(backend), None) => StatsScope::Backend(backend),
                _ => StatsScope::All,
            };
            print_json(&engine.get_stats(&scope)?)?;
        }
        Commands::Simulate {
            host,
            path,
            src_ip,
            headers,
            count,
        } => {
            let mut req = RequestAttributes::new(path);
            if let Some(host) = host {
                req = req.with_host(host);
            }
            if let Some(ip) = src_ip {
                req = req.with_src_ip(ip);
            }
            for (name, value) in headers {
                req = req.with_header(name, value);
            }

            let mut results = Vec::with_capacity(count);
            for _ in 0..count {
                results.push(match engine.handle_request(&req) {
                    Ok(decision) => {
                        engine.record_request_end(&decision, 0, 0)?;
                        SimulatedRequest {
                            backend: Some(decision.backend_id),
                            server: Some(decision.server_id),
                            error: None,
                        }
                    }
                    Err(e) => SimulatedRequest {
                        backend: None,
                        server: None,
                        error: Some(e.to_string()),
                    },
                });
            }
            print_json(&results)?;
        }
        Commands::AddServer {
            backend,
            id,
            host,
            port,
            weight,
        } => {
            engine.add_server(&backend, &ServerConfig::new(id, host, port).with_weight(weight))?;
            print_json(&engine.list_backends())?;
        }
        Commands::Check { rounds } => {
            let probe: Arc<dyn Probe> = Arc::new(TcpConnectProbe);
            for round in 1..=rounds {
                for report in engine.run_health_round(probe.clone()).await {
                    println!(
                        "round {}: {}/{} {} -> {}",
                        round, report.backend, report.server, report.transition.from, report.transition.to
                    );
                }
            }
            print_json(&engine.list_backends())?;
        }
        Commands::Run { stats_interval_secs } => {
            run(engine, Duration::from_secs(stats_interval_secs.max(1))).await?;
        }
    }

    Ok(())
}

async fn run(engine: RoutingEngine, stats_interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();
    let handles = engine.start_health_checks(Arc::new(TcpConnectProbe), shutdown.clone());
    tracing::info!(monitors = handles.len(), "Health monitors started");

    let mut ticker = tokio::time::interval(stats_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for backend in engine.list_backends() {
                    tracing::info!(
                        backend = %backend.id,
                        servers = backend.servers,
                        servers_up = backend.servers_up,
                        "Backend status"
                    );
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    shutdown.trigger();
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
