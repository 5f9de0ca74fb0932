//! Retry and circuit breaking for calls to flaky dependencies
//!
//! - **[`retry`]**: re-executes an operation under a [`RetryConfig`] with
//!   fixed, linear, exponential or jittered exponential backoff, for both
//!   blocking and async callers.
//! - **[`circuit_breaker`]**: a named three-state breaker that fails fast
//!   while a dependency is known to be down and probes its recovery.
//! - **[`clock`]**: time source injected into breakers so cooldowns can be
//!   tested without sleeping.
//!
//! The two patterns compose by nesting: retry around a breaker call retries
//! the breaker's own rejections and timeouts according to their
//! [`ErrorKind`](crate::error::ErrorKind).
//!
//! ```rust
//! # #[cfg(feature = "runtime")]
//! # {
//! use std::time::Duration;
//!
//! use assistkit_common::error::AppError;
//! use assistkit_common::resilience::{BackoffStrategy, RetryConfig, RetryHandler};
//!
//! let config = RetryConfig::builder()
//!     .max_attempts(2)
//!     .backoff(BackoffStrategy::Fixed)
//!     .base_delay(Duration::from_millis(1))
//!     .build()
//!     .unwrap();
//! let handler = RetryHandler::new(config).named("slack.post_message");
//!
//! let mut calls = 0;
//! let result = handler.retry_blocking(|| {
//!     calls += 1;
//!     if calls == 1 { Err(AppError::slack_api("rate limited", None)) } else { Ok(calls) }
//! });
//! assert_eq!(result.unwrap(), 2);
//! # }
//! ```

pub mod circuit_breaker;
pub mod clock;
pub mod retry;

pub use circuit_breaker::{
    BreakerSnapshot, CircuitBreaker, CircuitBreakerBuilderWithClock, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitState, ConfigError, ConfigResult, Guarded,
    ResilienceError, ResilienceResult,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use retry::{
    retry, retry_blocking, BackoffStrategy, Classification, Classifier, KindSet, RetryConfig,
    RetryConfigBuilder, RetryHandler, RetryOutcome, Retrying,
};
