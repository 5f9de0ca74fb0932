//! # AssistKit Infrastructure
//!
//! Process wiring for the AssistKit assistants.
//!
//! This crate contains:
//! - The named circuit breaker registry
//! - Health monitoring and the standard probes
//! - Configuration loading (environment and files)
//! - Logging initialisation
//! - [`AssistContext`], which owns all of the above for the process lifetime
//!
//! ## Architecture
//! - Builds on the primitives in `assistkit-common`
//! - Reads its settings from `assistkit-domain` configuration types
//! - Contains all process-global and background-task code

pub mod config;
pub mod context;
pub mod health;
pub mod observability;
pub mod resilience;

// Re-export commonly used items
pub use context::AssistContext;
pub use health::{HealthCheck, HealthMonitor, HealthStatus, HealthStatusListener};
pub use resilience::BreakerRegistry;
