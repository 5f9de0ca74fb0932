//! Three-state circuit breaker guarding one named dependency
//!
//! A breaker starts CLOSED and lets calls through. `failure_threshold`
//! consecutive failures open it; while OPEN every call is rejected with
//! [`ResilienceError::CircuitOpen`] until `recovery_timeout` has passed since
//! the last failure. The first call after that moves the breaker to
//! HALF_OPEN and is attempted. `success_threshold` successes in HALF_OPEN
//! close it again; any failure in HALF_OPEN reopens it.
//!
//! Every attempted call is bounded by `timeout`. An overrunning operation is
//! counted as a failure and abandoned: the blocking path leaves it running
//! on its worker thread, the async path drops its future.
//!
//! All state lives behind one mutex, and every transition (including
//! OPEN -> HALF_OPEN on admission) happens while that lock is held. When
//! several callers arrive after the cooldown, exactly one performs the
//! transition; the rest find the breaker already HALF_OPEN and are admitted
//! as trial calls too.

use std::fmt;
use std::future::Future;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use crate::error::{ErrorClassification, ErrorKind, ErrorSeverity};

/// Invalid resilience configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure of a breaker-guarded call
///
/// `Operation` holds the caller's own error untouched; the other variants
/// are produced by the breaker itself.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// Rejected without invoking the operation
    #[error("Circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    /// The operation overran the breaker's call timeout
    #[error("Circuit breaker '{name}' timed out the call after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// The operation itself failed
    #[error("{0}")]
    Operation(E),
}

/// Result type for breaker-guarded calls
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

impl<E> ResilienceError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The operation's own error, if that is what failed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }
}

impl<E: ErrorClassification> ErrorClassification for ResilienceError<E> {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Operation(err) => err.error_kind(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CircuitOpen { .. } | Self::Timeout { .. } => ErrorSeverity::High,
            Self::Operation(err) => err.severity(),
        }
    }

    fn retry_possible(&self) -> bool {
        match self {
            Self::CircuitOpen { .. } => false,
            Self::Timeout { .. } => true,
            Self::Operation(err) => err.retry_possible(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        self.as_inner().and_then(ErrorClassification::retry_after)
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through
    Closed,
    /// Calls are rejected until the cooldown elapses
    Open,
    /// Trial calls are attempted to probe recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Failures that open a closed circuit
    pub failure_threshold: u32,
    /// Time after the last failure before a trial call is allowed
    pub recovery_timeout: Duration,
    /// Trial successes that close a half-open circuit
    pub success_threshold: u32,
    /// Upper bound on a single attempted call
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new configuration with validation
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Create a configuration builder (alias for `new()`)
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// OpenAI: trips early, generous call timeout for completions.
    pub fn openai() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn composio() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn slack() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            timeout: Duration::from_secs(30),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        if self.success_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "success_threshold must be greater than 0".to_string(),
            });
        }

        if self.recovery_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "recovery_timeout must be greater than 0".to_string(),
            });
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "timeout must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set a custom clock for the circuit breaker (useful for testing)
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock }
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a CircuitBreaker directly
pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self, name: impl Into<String>) -> ConfigResult<CircuitBreaker<C>> {
        CircuitBreaker::with_clock(name, self.config, self.clock)
    }
}

/// Point-in-time view of a breaker, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
}

impl BreakerInner {
    const fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
            last_failure_time: None,
        }
    }
}

/// Circuit breaker for one named dependency
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    clock: C,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .field("success_count", &inner.success_count)
            .finish()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a named breaker on the system clock.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(name, config, SystemClock)
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: C,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { name: name.into(), config, inner: Mutex::new(BreakerInner::new()), clock })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state without admitting a call.
    ///
    /// An OPEN breaker whose cooldown has elapsed still reports OPEN here;
    /// only an admitted call moves it to HALF_OPEN.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Diagnostic snapshot; never changes state.
    pub fn get_state(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time,
        }
    }

    /// Run a blocking operation under the breaker.
    ///
    /// The operation runs on a dedicated thread so the caller is released
    /// after `timeout` even if the operation is still going. A panic in the
    /// operation counts as a failure and is resumed on the caller's thread.
    pub fn call<F, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if !self.admit() {
            return Err(ResilienceError::CircuitOpen { name: self.name.clone() });
        }

        let (tx, rx) = mpsc::channel();
        let worker = std::thread::spawn(move || {
            // The receiver is gone once the caller has timed out.
            let _ = tx.send(operation());
        });

        match rx.recv_timeout(self.config.timeout) {
            Ok(result) => self.settle(result),
            Err(mpsc::RecvTimeoutError::Timeout) => self.timed_out(),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.record_failure();
                match worker.join() {
                    Err(payload) => std::panic::resume_unwind(payload),
                    // The worker always sends before exiting normally.
                    Ok(()) => self.timed_out(),
                }
            }
        }
    }

    /// Run an async operation under the breaker, bounded by `timeout`.
    pub async fn call_async<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return Err(ResilienceError::CircuitOpen { name: self.name.clone() });
        }

        match tokio::time::timeout(self.config.timeout, operation()).await {
            Ok(result) => self.settle(result),
            Err(_) => self.timed_out(),
        }
    }

    /// Bind `operation` to this breaker for repeated calls.
    pub fn wrap<F>(self: &Arc<Self>, operation: F) -> Guarded<F, C> {
        Guarded { breaker: Arc::clone(self), operation }
    }

    /// Force the breaker back to CLOSED with cleared counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let from = inner.state;
        *inner = BreakerInner::new();
        info!(breaker = %self.name, from = %from, to = %CircuitState::Closed, "Circuit breaker reset");
    }

    fn settle<T, E>(&self, result: Result<T, E>) -> ResilienceResult<T, E> {
        match result {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(ResilienceError::Operation(err))
            }
        }
    }

    fn timed_out<T, E>(&self) -> ResilienceResult<T, E> {
        warn!(
            breaker = %self.name,
            timeout_ms = self.config.timeout.as_millis() as u64,
            outcome = "timeout",
            "Call timed out after {:?}",
            self.config.timeout
        );
        self.record_failure();
        Err(ResilienceError::Timeout { name: self.name.clone(), timeout: self.config.timeout })
    }

    fn admit(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner.last_failure.map_or(true, |at| {
                    self.clock.now().saturating_duration_since(at) >= self.config.recovery_timeout
                });
                if cooled_down {
                    inner.success_count = 0;
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    true
                } else {
                    debug!(breaker = %self.name, outcome = "rejected", "Circuit breaker rejecting call");
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.failure_count = 0;
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            CircuitState::Open => {
                debug!(breaker = %self.name, "Ignoring late success while circuit is open");
            }
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(self.clock.now());
        inner.last_failure_time = Some(DateTime::<Utc>::from(self.clock.system_time()));

        let trips = match inner.state {
            CircuitState::Closed => inner.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trips {
            self.transition(&mut inner, CircuitState::Open);
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        match to {
            CircuitState::Open => warn!(
                breaker = %self.name,
                from = %from,
                to = %to,
                failure_count = inner.failure_count,
                "Circuit breaker {} opened after {} failures",
                self.name,
                inner.failure_count
            ),
            CircuitState::HalfOpen | CircuitState::Closed => info!(
                breaker = %self.name,
                from = %from,
                to = %to,
                failure_count = inner.failure_count,
                success_count = inner.success_count,
                "Circuit breaker {} transitioned {from} -> {to}",
                self.name
            ),
        }
    }
}

/// An operation bound to a breaker, see [`CircuitBreaker::wrap`]
pub struct Guarded<F, C: Clock = SystemClock> {
    breaker: Arc<CircuitBreaker<C>>,
    operation: F,
}

impl<F, C: Clock> Guarded<F, C> {
    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    /// Invoke a blocking operation through the breaker.
    pub fn call<T, E>(&self) -> ResilienceResult<T, E>
    where
        F: Fn() -> Result<T, E> + Clone + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.breaker.call(self.operation.clone())
    }

    /// Invoke an async operation through the breaker.
    pub async fn call_async<Fut, T, E>(&mut self) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let operation = &mut self.operation;
        self.breaker.call_async(operation).await
    }
}
