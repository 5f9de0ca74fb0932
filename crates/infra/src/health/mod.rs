//! Health checks
//!
//! [`HealthMonitor`] polls registered probes on a background task and keeps
//! the latest result per check; [`probes`] holds the standard database and
//! API probe factories.

pub mod monitor;
pub mod probes;
pub mod types;

pub use monitor::{HealthMonitor, Probe};
pub use types::{HealthCheck, HealthStatus, HealthStatusListener};
