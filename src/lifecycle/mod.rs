//! Lifecycle management.
//!
//! # Responsibilities
//! - Coordinate shutdown of background tasks (health monitors)
//!
//! # Design Decisions
//! - Broadcast channel so every monitor loop hears one trigger
//! - Trigger is latched for tasks that start late

pub mod shutdown;

pub use shutdown::Shutdown;
