//! Named circuit breaker registry
//!
//! Each external dependency gets exactly one breaker for the lifetime of the
//! registry, so every handler calling Slack sees the same failure count.
//! Registries are constructed explicitly at startup and shared behind an
//! `Arc`; tests build their own isolated instances.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use assistkit_common::resilience::{
    BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, ResilienceResult,
};
use assistkit_domain::{AssistError, BreakerSettings, Result};
use parking_lot::RwLock;
use tracing::{debug, info};

/// Registry of named circuit breakers
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: RwLock<BTreeMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `openai`, `composio` and `slack` breakers.
    ///
    /// # Errors
    /// Returns `AssistError::Config` if a preset fails validation.
    pub fn with_defaults() -> Result<Self> {
        Self::from_settings(&BreakerSettings::presets())
    }

    /// Build one breaker per configured entry.
    ///
    /// # Errors
    /// Returns `AssistError::Config` naming the first breaker whose settings
    /// are rejected.
    pub fn from_settings(settings: &BTreeMap<String, BreakerSettings>) -> Result<Self> {
        let registry = Self::new();
        for (name, entry) in settings {
            registry.register(name.as_str(), breaker_config(entry))?;
        }
        Ok(registry)
    }

    /// Install (or replace) the breaker for `name`.
    ///
    /// Replacing a breaker drops its accumulated state; callers holding the
    /// old `Arc` keep using the old instance.
    ///
    /// # Errors
    /// Returns `AssistError::Config` if `config` is invalid.
    pub fn register(
        &self,
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Result<Arc<CircuitBreaker>> {
        let name = name.into();
        let breaker = CircuitBreaker::new(name.clone(), config)
            .map_err(|e| AssistError::Config(format!("breaker '{name}': {e}")))?;
        let breaker = Arc::new(breaker);

        info!(
            breaker = %name,
            failure_threshold = breaker.config().failure_threshold,
            recovery_timeout_secs = breaker.config().recovery_timeout.as_secs(),
            "Registered circuit breaker"
        );
        self.breakers.write().insert(name, Arc::clone(&breaker));
        Ok(breaker)
    }

    /// Look up a breaker by name.
    ///
    /// # Errors
    /// Returns `AssistError::Registry` if no breaker is registered under
    /// `name`.
    pub fn get(&self, name: &str) -> Result<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| AssistError::Registry(format!("Circuit breaker '{name}' not found")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.breakers.read().contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.breakers.read().keys().cloned().collect()
    }

    /// Run a blocking operation under the named breaker.
    ///
    /// The outer `Result` fails before `operation` is touched when the name is
    /// unknown; the inner one is the breaker's verdict.
    ///
    /// # Errors
    /// Returns `AssistError::Registry` for an unknown breaker name.
    pub fn call<F, T, E>(&self, name: &str, operation: F) -> Result<ResilienceResult<T, E>>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let breaker = self.get(name)?;
        Ok(breaker.call(operation))
    }

    /// Async counterpart of [`call`](Self::call).
    ///
    /// # Errors
    /// Returns `AssistError::Registry` for an unknown breaker name.
    pub async fn call_async<F, Fut, T, E>(
        &self,
        name: &str,
        operation: F,
    ) -> Result<ResilienceResult<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let breaker = self.get(name)?;
        Ok(breaker.call_async(operation).await)
    }

    /// State of every registered breaker, keyed by name
    pub fn snapshots(&self) -> BTreeMap<String, BreakerSnapshot> {
        self.breakers
            .read()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.get_state()))
            .collect()
    }

    /// Force the named breaker back to CLOSED.
    ///
    /// # Errors
    /// Returns `AssistError::Registry` for an unknown breaker name.
    pub fn reset(&self, name: &str) -> Result<()> {
        self.get(name)?.reset();
        debug!(breaker = %name, "Circuit breaker reset via registry");
        Ok(())
    }
}

fn breaker_config(settings: &BreakerSettings) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: settings.failure_threshold,
        recovery_timeout: Duration::from_secs(settings.recovery_timeout_secs),
        success_threshold: settings.success_threshold,
        timeout: Duration::from_secs(settings.timeout_secs),
    }
}
