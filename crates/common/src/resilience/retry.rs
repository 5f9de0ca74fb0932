//! Retry with backoff for blocking and async operations
//!
//! A [`RetryHandler`] re-executes a fallible operation according to an
//! immutable [`RetryConfig`]. Whether a failure is worth another attempt is
//! decided from the error's [`ErrorKind`] and its self-declared
//! retriability, never from its concrete type:
//!
//! 1. a kind in `non_retriable` stops immediately (this always wins);
//! 2. a custom classifier, when configured, may decide next;
//! 3. a kind in `retriable`, or an error declaring `retry_possible`, retries;
//! 4. anything else is unclassified and fails closed.
//!
//! The error returned after the last attempt is the operation's own error,
//! untouched, so callers keep matching on their own types.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::ConfigError;
use crate::error::{ErrorClassification, ErrorKind};

/// Backoff strategy for computing the delay before the next attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `base_delay` every time
    Fixed,
    /// `base_delay * attempt`
    Linear,
    /// `base_delay * 2^(attempt - 1)`
    Exponential,
    /// Exponential, perturbed by up to `jitter_range` of itself either way
    #[default]
    ExponentialJitter,
}

impl BackoffStrategy {
    /// Un-jittered, unclamped delay in seconds for a 1-indexed attempt.
    fn base_secs(self, base_delay: Duration, attempt: u32) -> f64 {
        let base = base_delay.as_secs_f64();
        match self {
            Self::Fixed => base,
            Self::Linear => base * f64::from(attempt),
            Self::Exponential | Self::ExponentialJitter => {
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                base * 2f64.powi(exponent)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::ExponentialJitter => "exponential_jitter",
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            "exponential_jitter" => Ok(Self::ExponentialJitter),
            other => {
                Err(ConfigError::Invalid { message: format!("unknown backoff strategy '{other}'") })
            }
        }
    }
}

/// Verdict of retry classification for one error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retriable,
    NonRetriable,
    /// Not covered by the policy; treated as non-retriable
    Unknown,
}

/// Set of error kinds a policy matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindSet {
    /// Every kind
    Any,
    /// Only the listed kinds (possibly none)
    Only(BTreeSet<ErrorKind>),
}

impl KindSet {
    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    pub fn of(kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        Self::Only(kinds.into_iter().collect())
    }

    /// Connection failures, timeouts and throttling.
    pub fn transient() -> Self {
        Self::of(ErrorKind::ALL.into_iter().filter(|kind| kind.is_transient()))
    }

    pub fn contains(&self, kind: ErrorKind) -> bool {
        match self {
            Self::Any => true,
            Self::Only(kinds) => kinds.contains(&kind),
        }
    }

    fn extend(&mut self, kinds: impl IntoIterator<Item = ErrorKind>) {
        if let Self::Only(existing) = self {
            existing.extend(kinds);
        }
    }
}

/// Custom classification function consulted before the kind sets
pub type Classifier = Arc<dyn Fn(ErrorKind) -> Classification + Send + Sync>;

/// Configuration for retry behavior
///
/// Shared read-only once handed to a [`RetryHandler`].
#[derive(Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound applied to every computed delay
    pub max_delay: Duration,
    pub backoff_strategy: BackoffStrategy,
    /// Fraction of the exponential delay used as jitter amplitude
    pub jitter_range: f64,
    pub retriable: KindSet,
    pub non_retriable: KindSet,
    classifier: Option<Classifier>,
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_strategy", &self.backoff_strategy)
            .field("jitter_range", &self.jitter_range)
            .field("retriable", &self.retriable)
            .field("non_retriable", &self.non_retriable)
            .field("classifier", &self.classifier.is_some())
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_strategy: BackoffStrategy::ExponentialJitter,
            jitter_range: 0.1,
            retriable: KindSet::Any,
            non_retriable: KindSet::none(),
            classifier: None,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with validation
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Create a configuration builder (alias for `new()`)
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts must be at least 1"));
        }
        if self.base_delay.is_zero() {
            return Err(invalid("base_delay must be greater than 0"));
        }
        if self.max_delay < self.base_delay {
            return Err(invalid("max_delay must be greater than or equal to base_delay"));
        }
        if !(0.0..=1.0).contains(&self.jitter_range) {
            return Err(invalid("jitter_range must be within [0, 1]"));
        }
        Ok(())
    }

    /// Delay before the attempt after `attempt` (1-indexed), clamped to
    /// `max_delay`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let unit = if self.backoff_strategy == BackoffStrategy::ExponentialJitter {
            rand::thread_rng().gen_range(-1.0..=1.0)
        } else {
            0.0
        };
        self.delay_with_unit(attempt, unit)
    }

    /// `unit` is the jitter draw in `[-1, 1]`.
    fn delay_with_unit(&self, attempt: u32, unit: f64) -> Duration {
        let mut secs = self.backoff_strategy.base_secs(self.base_delay, attempt);
        if self.backoff_strategy == BackoffStrategy::ExponentialJitter {
            secs += secs * self.jitter_range * unit;
        }
        let capped = secs.clamp(0.0, self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Copy of this config consulting `classifier` before the kind sets.
    #[must_use]
    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(ErrorKind) -> Classification + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Classify an error kind; `retry_possible` is the error's own claim.
    pub fn classify(&self, kind: ErrorKind, retry_possible: bool) -> Classification {
        if self.non_retriable.contains(kind) {
            return Classification::NonRetriable;
        }
        if let Some(classifier) = &self.classifier {
            match classifier(kind) {
                Classification::Unknown => {}
                verdict => return verdict,
            }
        }
        if self.retriable.contains(kind) || retry_possible {
            Classification::Retriable
        } else {
            Classification::Unknown
        }
    }

    /// Whether `error` earns another attempt under this policy.
    pub fn is_retriable<E: ErrorClassification + ?Sized>(&self, error: &E) -> bool {
        self.classify(error.error_kind(), error.retry_possible()) == Classification::Retriable
    }

    /// 3 attempts, 1s base, 60s cap, exponential with 10% jitter, any kind.
    pub fn default_policy() -> Self {
        Self::default()
    }

    /// Policy for third-party HTTP APIs: 5 attempts, 2s base, 30s cap,
    /// exponential with jitter, never retrying malformed requests.
    pub fn api() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            non_retriable: KindSet::of([ErrorKind::Validation, ErrorKind::InvalidType]),
            ..Self::default()
        }
    }

    /// Policy for database calls: 3 attempts, 500ms base, 10s cap,
    /// exponential without jitter.
    pub fn database() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_strategy: BackoffStrategy::Exponential,
            ..Self::default()
        }
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid { message: message.to_string() }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.config.backoff_strategy = strategy;
        self
    }

    pub fn jitter_range(mut self, range: f64) -> Self {
        self.config.jitter_range = range;
        self
    }

    /// Retry only the listed kinds (plus self-declared retriable errors).
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.config.retriable = KindSet::of(kinds);
        self
    }

    pub fn retry_on_any(mut self) -> Self {
        self.config.retriable = KindSet::Any;
        self
    }

    /// Never retry the listed kinds, whatever else matches.
    pub fn never_retry(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.config.non_retriable.extend(kinds);
        self
    }

    pub fn classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(ErrorKind) -> Classification + Send + Sync + 'static,
    {
        self.config = self.config.with_classifier(classifier);
        self
    }

    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Result of a retried operation with attempt statistics
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    /// Invocations of the operation, including the successful one
    pub attempts: u32,
    /// Sum of the delays slept between attempts
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

enum Step {
    Retry(Duration),
    GiveUp,
}

/// Executes operations under a shared [`RetryConfig`]
///
/// Cloning is cheap; clones share the config. [`named`](Self::named) gives a
/// clone whose log records carry a specific operation name.
#[derive(Debug, Clone)]
pub struct RetryHandler {
    config: Arc<RetryConfig>,
    operation: Cow<'static, str>,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config: Arc::new(config), operation: Cow::Borrowed("operation") }
    }

    /// See [`RetryConfig::default_policy`].
    pub fn default_policy() -> Self {
        Self::new(RetryConfig::default_policy())
    }

    /// See [`RetryConfig::api`].
    pub fn api() -> Self {
        Self::new(RetryConfig::api())
    }

    /// See [`RetryConfig::database`].
    pub fn database() -> Self {
        Self::new(RetryConfig::database())
    }

    /// Clone of this handler that logs under `operation`.
    pub fn named(&self, operation: impl Into<Cow<'static, str>>) -> Self {
        Self { config: Arc::clone(&self.config), operation: operation.into() }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Run a blocking operation, sleeping the current thread between
    /// attempts.
    pub fn retry_blocking<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: ErrorClassification + fmt::Display,
    {
        self.retry_blocking_with_outcome(operation).into_result()
    }

    pub fn retry_blocking_with_outcome<F, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: ErrorClassification + fmt::Display,
    {
        let mut total_delay = Duration::ZERO;
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => {
                    self.on_success(attempt);
                    return RetryOutcome { result: Ok(value), attempts: attempt, total_delay };
                }
                Err(err) => match self.after_failure(&err, attempt) {
                    Step::Retry(delay) => {
                        std::thread::sleep(delay);
                        total_delay += delay;
                        attempt += 1;
                    }
                    Step::GiveUp => {
                        return RetryOutcome { result: Err(err), attempts: attempt, total_delay };
                    }
                },
            }
        }
    }

    /// Run an async operation, suspending between attempts.
    pub async fn retry<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorClassification + fmt::Display,
    {
        self.retry_with_outcome(operation).await.into_result()
    }

    #[instrument(
        skip_all,
        fields(operation = %self.operation, max_attempts = self.config.max_attempts)
    )]
    pub async fn retry_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorClassification + fmt::Display,
    {
        let mut total_delay = Duration::ZERO;
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    self.on_success(attempt);
                    return RetryOutcome { result: Ok(value), attempts: attempt, total_delay };
                }
                Err(err) => match self.after_failure(&err, attempt) {
                    Step::Retry(delay) => {
                        tokio::time::sleep(delay).await;
                        total_delay += delay;
                        attempt += 1;
                    }
                    Step::GiveUp => {
                        return RetryOutcome { result: Err(err), attempts: attempt, total_delay };
                    }
                },
            }
        }
    }

    /// Bind `operation` to this policy, producing a reusable retrying call.
    pub fn wrap<F>(&self, operation: F) -> Retrying<F> {
        Retrying { handler: self.clone(), operation }
    }

    fn on_success(&self, attempt: u32) {
        if attempt > 1 {
            info!(
                operation = %self.operation,
                attempt,
                outcome = "succeeded",
                "Operation succeeded on attempt {attempt}"
            );
        } else {
            debug!(operation = %self.operation, outcome = "succeeded", "Operation succeeded");
        }
    }

    fn after_failure<E>(&self, err: &E, attempt: u32) -> Step
    where
        E: ErrorClassification + fmt::Display,
    {
        let kind = err.error_kind();
        let classification = self.config.classify(kind, err.retry_possible());

        if classification != Classification::Retriable {
            info!(
                operation = %self.operation,
                attempt,
                kind = %kind,
                classification = ?classification,
                severity = %err.severity(),
                outcome = "not_retried",
                error = %err,
                "Non-retriable error, not retrying"
            );
            return Step::GiveUp;
        }

        if attempt >= self.config.max_attempts {
            error!(
                operation = %self.operation,
                attempts = attempt,
                kind = %kind,
                severity = %err.severity(),
                outcome = "exhausted",
                error = %err,
                "All {} attempts failed",
                self.config.max_attempts
            );
            return Step::GiveUp;
        }

        let delay = self.config.calculate_delay(attempt);
        warn!(
            operation = %self.operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            kind = %kind,
            severity = %err.severity(),
            outcome = "retrying",
            error = %err,
            "Attempt {attempt} failed, retrying in {:.2}s",
            delay.as_secs_f64()
        );
        Step::Retry(delay)
    }
}

impl Default for RetryHandler {
    fn default() -> Self {
        Self::default_policy()
    }
}

/// An operation bound to a retry policy, see [`RetryHandler::wrap`]
pub struct Retrying<F> {
    handler: RetryHandler,
    operation: F,
}

impl<F> Retrying<F> {
    pub fn handler(&self) -> &RetryHandler {
        &self.handler
    }

    /// Invoke a blocking operation under the policy.
    pub fn call<T, E>(&mut self) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: ErrorClassification + fmt::Display,
    {
        self.handler.retry_blocking(&mut self.operation)
    }

    /// Invoke an async operation under the policy.
    pub async fn call_async<Fut, T, E>(&mut self) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorClassification + fmt::Display,
    {
        self.handler.retry(&mut self.operation).await
    }
}

/// Retry an async operation under `config`.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorClassification + fmt::Display,
{
    RetryHandler::new(config.clone()).retry(operation).await
}

/// Retry a blocking operation under `config`.
pub fn retry_blocking<F, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: ErrorClassification + fmt::Display,
{
    RetryHandler::new(config.clone()).retry_blocking(operation)
}

#[cfg(test)]
mod tests {
    //! Unit tests for backoff computation, classification and the retry
    //! loops
    //!
    //! Async loops run on paused tokio time so multi-second backoffs
    //! complete instantly.

    use super::*;
    use crate::testing::{FlakyOperation, TestError};

    fn no_jitter(strategy: BackoffStrategy) -> RetryConfig {
        RetryConfig::builder()
            .backoff(strategy)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(2))
            .jitter_range(0.0)
            .build()
            .unwrap()
    }

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(max_attempts)
            .backoff(BackoffStrategy::Fixed)
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    /// Validates the per-strategy delay formulas.
    ///
    /// Assertions:
    /// - Confirms fixed stays at `base_delay`.
    /// - Confirms linear grows by `base_delay` per attempt.
    /// - Confirms exponential doubles per attempt.
    #[test]
    fn test_strategy_formulas() {
        let fixed = no_jitter(BackoffStrategy::Fixed);
        assert_eq!(fixed.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(fixed.calculate_delay(7), Duration::from_millis(100));

        let linear = no_jitter(BackoffStrategy::Linear);
        assert_eq!(linear.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(linear.calculate_delay(3), Duration::from_millis(300));

        let exponential = no_jitter(BackoffStrategy::Exponential);
        assert_eq!(exponential.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(exponential.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(exponential.calculate_delay(4), Duration::from_millis(800));
    }

    /// Validates monotonic, capped backoff without jitter.
    ///
    /// Assertions:
    /// - Ensures delays never decrease with the attempt number.
    /// - Ensures every delay is at most `max_delay`.
    #[test]
    fn test_backoff_monotonic_and_capped() {
        for strategy in [BackoffStrategy::Linear, BackoffStrategy::Exponential] {
            let config = no_jitter(strategy);
            let mut previous = Duration::ZERO;
            for attempt in 1..=64 {
                let delay = config.calculate_delay(attempt);
                assert!(delay >= previous, "{strategy} decreased at attempt {attempt}");
                assert!(delay <= config.max_delay, "{strategy} exceeded cap at {attempt}");
                previous = delay;
            }
            assert_eq!(previous, config.max_delay);
        }
    }

    #[test]
    fn test_huge_attempt_numbers_saturate_at_cap() {
        let config = no_jitter(BackoffStrategy::Exponential);
        assert_eq!(config.calculate_delay(u32::MAX), config.max_delay);
    }

    /// Validates jitter boundedness on random draws.
    ///
    /// Assertions:
    /// - Ensures every jittered delay lies within
    ///   `[exp * (1 - range), min(exp * (1 + range), max_delay)]`.
    #[test]
    fn test_jitter_bounded() {
        let config = RetryConfig::builder()
            .backoff(BackoffStrategy::ExponentialJitter)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(1))
            .jitter_range(0.25)
            .build()
            .unwrap();

        for attempt in 1..=5 {
            let exp = 0.1 * 2f64.powi(attempt as i32 - 1);
            let lower = (exp * 0.75).min(1.0);
            let upper = (exp * 1.25).min(1.0);
            for _ in 0..200 {
                let secs = config.calculate_delay(attempt).as_secs_f64();
                assert!(secs >= lower - 1e-9, "attempt {attempt}: {secs} < {lower}");
                assert!(secs <= upper + 1e-9, "attempt {attempt}: {secs} > {upper}");
            }
        }
    }

    #[test]
    fn test_jitter_extremes() {
        let config = RetryConfig::builder()
            .base_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .jitter_range(0.5)
            .build()
            .unwrap();

        assert_eq!(config.delay_with_unit(2, -1.0), Duration::from_secs(1));
        assert_eq!(config.delay_with_unit(2, 1.0), Duration::from_secs(3));
        assert_eq!(config.delay_with_unit(2, 0.0), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_jitter_range_matches_exponential() {
        let jittered = RetryConfig::builder()
            .backoff(BackoffStrategy::ExponentialJitter)
            .jitter_range(0.0)
            .build()
            .unwrap();
        let plain = RetryConfig::builder().backoff(BackoffStrategy::Exponential).build().unwrap();

        for attempt in 1..=6 {
            assert_eq!(jittered.calculate_delay(attempt), plain.calculate_delay(attempt));
        }
    }

    /// Validates configuration validation.
    ///
    /// Assertions:
    /// - Ensures zero attempts, zero base delay, inverted bounds and
    ///   out-of-range jitter are rejected.
    #[test]
    fn test_config_validation() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder().base_delay(Duration::ZERO).build().is_err());
        assert!(RetryConfig::builder()
            .base_delay(Duration::from_secs(5))
            .max_delay(Duration::from_secs(1))
            .build()
            .is_err());
        assert!(RetryConfig::builder().jitter_range(1.5).build().is_err());
        assert!(RetryConfig::builder().jitter_range(f64::NAN).build().is_err());
    }

    #[test]
    fn test_presets() {
        let default = RetryConfig::default_policy();
        assert_eq!(default.max_attempts, 3);
        assert_eq!(default.base_delay, Duration::from_secs(1));
        assert_eq!(default.max_delay, Duration::from_secs(60));
        assert_eq!(default.backoff_strategy, BackoffStrategy::ExponentialJitter);

        let api = RetryConfig::api();
        assert_eq!(api.max_attempts, 5);
        assert_eq!(api.max_delay, Duration::from_secs(30));
        assert!(api.non_retriable.contains(ErrorKind::Validation));
        assert!(api.non_retriable.contains(ErrorKind::InvalidType));
        assert!(api.validate().is_ok());

        let database = RetryConfig::database();
        assert_eq!(database.base_delay, Duration::from_millis(500));
        assert_eq!(database.backoff_strategy, BackoffStrategy::Exponential);
        assert!(database.validate().is_ok());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("fixed".parse::<BackoffStrategy>().unwrap(), BackoffStrategy::Fixed);
        assert_eq!(
            "EXPONENTIAL_JITTER".parse::<BackoffStrategy>().unwrap(),
            BackoffStrategy::ExponentialJitter
        );
        assert!("fibonacci".parse::<BackoffStrategy>().is_err());
        assert_eq!(BackoffStrategy::Linear.to_string(), "linear");
    }

    /// Validates the classification order.
    ///
    /// Assertions:
    /// - Confirms non-retriable kinds win over `KindSet::Any`.
    /// - Confirms self-declared retriable errors retry outside the whitelist.
    /// - Confirms unlisted kinds are `Unknown`.
    #[test]
    fn test_classification_order() {
        let config = RetryConfig::builder()
            .retry_on([ErrorKind::Connection])
            .never_retry([ErrorKind::Security])
            .build()
            .unwrap();

        assert_eq!(config.classify(ErrorKind::Connection, false), Classification::Retriable);
        assert_eq!(config.classify(ErrorKind::Backend, true), Classification::Retriable);
        assert_eq!(config.classify(ErrorKind::Backend, false), Classification::Unknown);
        assert_eq!(config.classify(ErrorKind::Security, true), Classification::NonRetriable);

        let any = RetryConfig::builder().never_retry([ErrorKind::Validation]).build().unwrap();
        assert_eq!(any.classify(ErrorKind::Validation, true), Classification::NonRetriable);
        assert_eq!(any.classify(ErrorKind::Internal, false), Classification::Retriable);
    }

    #[test]
    fn test_custom_classifier() {
        let config = RetryConfig::builder()
            .retry_on([])
            .never_retry([ErrorKind::Security])
            .classifier(|kind| match kind {
                ErrorKind::Backend | ErrorKind::Security => Classification::Retriable,
                ErrorKind::Timeout => Classification::NonRetriable,
                _ => Classification::Unknown,
            })
            .build()
            .unwrap();

        assert_eq!(config.classify(ErrorKind::Backend, false), Classification::Retriable);
        assert_eq!(config.classify(ErrorKind::Timeout, true), Classification::NonRetriable);
        assert_eq!(config.classify(ErrorKind::Security, false), Classification::NonRetriable);
        assert_eq!(config.classify(ErrorKind::Unknown, true), Classification::Retriable);
        assert_eq!(config.classify(ErrorKind::Unknown, false), Classification::Unknown);
    }

    /// Validates retry termination on a persistently failing operation.
    ///
    /// Assertions:
    /// - Confirms the operation runs exactly `max_attempts` times.
    /// - Confirms the returned error is the last one the operation raised.
    #[test]
    fn test_blocking_retry_exhausts_attempts() {
        let handler = RetryHandler::new(fast(4));
        let flaky = FlakyOperation::always_failing(ErrorKind::Connection);

        let outcome = handler.retry_blocking_with_outcome(|| flaky.invoke());

        assert_eq!(flaky.calls(), 4);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.total_delay, Duration::from_millis(3));
        assert_eq!(outcome.result.unwrap_err(), TestError::new(ErrorKind::Connection, 4));
    }

    #[test]
    fn test_blocking_retry_recovers() {
        let handler = RetryHandler::new(fast(5));
        let flaky = FlakyOperation::new(2, ErrorKind::Timeout);

        let result = handler.retry_blocking(|| flaky.invoke());

        assert_eq!(result.unwrap(), 3);
        assert_eq!(flaky.calls(), 3);
    }

    /// Validates the non-retriable short-circuit.
    ///
    /// Assertions:
    /// - Confirms a blacklisted kind is attempted exactly once.
    #[test]
    fn test_non_retriable_short_circuits() {
        let config = RetryConfig::builder()
            .max_attempts(10)
            .base_delay(Duration::from_millis(1))
            .never_retry([ErrorKind::Validation])
            .build()
            .unwrap();
        let handler = RetryHandler::new(config);
        let flaky = FlakyOperation::always_failing(ErrorKind::Validation);

        let err = handler.retry_blocking(|| flaky.invoke()).unwrap_err();

        assert_eq!(flaky.calls(), 1);
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_unclassified_errors_fail_closed() {
        let config = RetryConfig::builder()
            .max_attempts(5)
            .base_delay(Duration::from_millis(1))
            .retry_on([ErrorKind::Connection])
            .build()
            .unwrap();
        let handler = RetryHandler::new(config);

        let flaky = FlakyOperation::always_failing(ErrorKind::Backend);
        assert!(handler.retry_blocking(|| flaky.invoke()).is_err());
        assert_eq!(flaky.calls(), 1);

        let self_declared = FlakyOperation::always_failing(ErrorKind::Backend).self_retriable();
        assert!(handler.retry_blocking(|| self_declared.invoke()).is_err());
        assert_eq!(self_declared.calls(), 5);
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let handler = RetryHandler::new(fast(1));
        let flaky = FlakyOperation::always_failing(ErrorKind::Connection);

        assert!(handler.retry_blocking(|| flaky.invoke()).is_err());
        assert_eq!(flaky.calls(), 1);
    }

    /// Validates the async loop under paused time.
    ///
    /// Assertions:
    /// - Confirms the async path honours the same attempt bound.
    /// - Confirms the recorded total delay equals the sum of exponential
    ///   backoffs (1s + 2s + 4s).
    #[tokio::test(start_paused = true)]
    async fn test_async_retry_exhausts_attempts() {
        let config = RetryConfig::builder()
            .max_attempts(4)
            .backoff(BackoffStrategy::Exponential)
            .build()
            .unwrap();
        let handler = RetryHandler::new(config).named("notion.search");
        let flaky = FlakyOperation::always_failing(ErrorKind::Timeout);

        let op = &flaky;
        let outcome = handler.retry_with_outcome(move || async move { op.invoke() }).await;

        assert_eq!(flaky.calls(), 4);
        assert_eq!(outcome.total_delay, Duration::from_secs(7));
        assert_eq!(outcome.result.unwrap_err().attempt, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_retry_recovers() {
        let handler = RetryHandler::api();
        let flaky = FlakyOperation::new(3, ErrorKind::RateLimited);

        let op = &flaky;
        let result = handler.retry(move || async move { op.invoke() }).await;

        assert_eq!(result.unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrapped_operation_is_reusable() {
        let flaky = FlakyOperation::new(1, ErrorKind::Connection);
        let mut wrapped = RetryHandler::new(fast(3)).wrap(|| {
            let flaky = flaky.clone();
            async move { flaky.invoke() }
        });

        assert_eq!(wrapped.call_async().await.unwrap(), 2);
        assert_eq!(wrapped.call_async().await.unwrap(), 3);
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn test_free_functions() {
        let flaky = FlakyOperation::new(1, ErrorKind::Connection);
        assert_eq!(retry_blocking(&fast(2), || flaky.invoke()).unwrap(), 2);

        let flaky = FlakyOperation::always_failing(ErrorKind::Connection);
        let op = &flaky;
        let result = tokio_test::block_on(retry(&fast(2), move || async move { op.invoke() }));
        assert!(result.is_err());
        assert_eq!(flaky.calls(), 2);
    }

    #[test]
    fn test_named_handler_shares_config() {
        let handler = RetryHandler::database();
        let named = handler.named("tasks.fetch");
        assert_eq!(named.operation(), "tasks.fetch");
        assert_eq!(handler.operation(), "operation");
        assert!(Arc::ptr_eq(&handler.config, &named.config));
    }
}
