//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated)
//!     → RoutingEngine::from_config
//! ```
//!
//! # Design Decisions
//! - Config is the startup snapshot; runtime changes go through the engine
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AclConfig;
pub use schema::AclRuleConfig;
pub use schema::Algorithm;
pub use schema::BackendConfig;
pub use schema::BalancerConfig;
pub use schema::FrontendConfig;
pub use schema::HealthCheckConfig;
pub use schema::Mode;
pub use schema::ServerConfig;
