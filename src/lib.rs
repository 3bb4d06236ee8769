//! Load balancer routing-and-health engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   RequestAttributes
//!         │
//!         ▼
//!   ┌───────────┐    ┌──────────────┐    ┌───────────────┐
//!   │ AclRouter │───▶│ BackendPool  │───▶│ LoadBalancer  │───▶ RoutingDecision
//!   │ (routing) │    │(load_balancer)│   │  (algorithm)  │
//!   └───────────┘    └──────┬───────┘    └───────────────┘
//!                           │ server state
//!                    ┌──────┴───────┐
//!                    │HealthMonitor │  probes run off the request path
//!                    │   (health)   │
//!                    └──────────────┘
//!
//!   Cross-cutting: config · stats · render · observability · lifecycle
//! ```

// Core subsystems
pub mod config;
pub mod engine;
pub mod error;
pub mod routing;

// Traffic management
pub mod health;
pub mod load_balancer;

// Read side
pub mod render;
pub mod stats;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::BalancerConfig;
pub use engine::{RoutingDecision, RoutingEngine};
pub use error::{LbError, Result};
pub use lifecycle::Shutdown;
