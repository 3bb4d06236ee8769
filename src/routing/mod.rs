//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request attributes (host, path, headers, source)
//!     → router.rs (ACL table lookup)
//!     → matcher.rs (evaluate rule conditions)
//!     → Return: backend id, default backend, or NoRouteAvailable
//!
//! Rule Compilation:
//!     AclRuleConfig[]
//!     → Compile matchers (declared order kept)
//!     → Freeze as immutable AclTable, swapped whole on replace
//! ```
//!
//! # Design Decisions
//! - No regex in hot path (prefix and exact matching only)
//! - Deterministic: same input always matches same rule
//! - First match wins (declared order)

pub mod matcher;
pub mod request;
pub mod router;

pub use request::RequestAttributes;
pub use router::AclRouter;
