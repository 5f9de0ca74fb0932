//! Process-wide resilience wiring
//!
//! The primitives live in `assistkit-common`; this module owns the named
//! breaker instances an assistant process shares between its handlers.

pub mod registry;

pub use registry::BreakerRegistry;
