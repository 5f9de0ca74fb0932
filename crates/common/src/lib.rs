//! Reusable resilience and metrics primitives shared across AssistKit crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error taxonomy (`ErrorKind`, `ErrorClassification`,
//!   `AppError`)
//! - `observability`: adds `tracing` and the `ErrorHandler`
//! - `runtime` (default): retry engine, circuit breakers and the metrics
//!   collector
//! - `test-utils`: test doubles for downstream crates' tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod observability;
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "observability")]
pub use error::ErrorHandler;
#[cfg(feature = "foundation")]
pub use error::{AppError, ErrorClassification, ErrorKind, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use observability::{MetricsCollector, MetricsRecorder, MetricsSummary, TimerGuard};
#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock,
    MockClock, ResilienceError, ResilienceResult, RetryConfig, RetryHandler, SystemClock,
};
