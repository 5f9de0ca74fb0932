//! Application context
//!
//! `AssistContext` is built once at startup from the loaded [`AppConfig`] and
//! owns every shared resilience and observability component. Handlers get
//! the pieces they need from it instead of reaching for globals.

use std::sync::Arc;
use std::time::Duration;

use assistkit_common::observability::{MetricsCollector, MetricsRecorder};
use assistkit_common::resilience::{BackoffStrategy, RetryConfig, RetryHandler};
use assistkit_domain::{AppConfig, AssistError, Result, RetrySettings};
use tracing::info;

use crate::health::HealthMonitor;
use crate::observability::metrics_from_config;
use crate::resilience::BreakerRegistry;

/// Shared runtime components of one assistant process
#[derive(Debug)]
pub struct AssistContext {
    config: AppConfig,
    breakers: Arc<BreakerRegistry>,
    metrics: Arc<MetricsCollector>,
    health: Arc<HealthMonitor>,
    retry: RetryHandler,
}

impl AssistContext {
    /// Validate `config` and build every component from it.
    ///
    /// # Errors
    /// Returns `AssistError::Config` if any section is invalid.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let breakers = Arc::new(BreakerRegistry::from_settings(&config.breakers)?);
        let metrics = Arc::new(metrics_from_config(&config.metrics));
        let recorder: Arc<dyn MetricsRecorder> = metrics.clone();
        let health =
            Arc::new(HealthMonitor::from_config(&config.monitoring).with_metrics(recorder));
        let retry = RetryHandler::new(retry_config(&config.retry)?).named("default");

        info!(
            breakers = ?breakers.names(),
            environment = %config.logging.environment,
            "Assist context initialised"
        );

        Ok(Self { config, breakers, metrics, health, retry })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Retry handler for the configured default policy
    pub fn retry(&self) -> &RetryHandler {
        &self.retry
    }

    /// API latency above which API probes report DEGRADED
    pub fn api_latency_threshold(&self) -> Duration {
        Duration::from_millis(self.config.monitoring.api_latency_threshold_ms)
    }

    /// Begin background health monitoring. Returns `false` if already running.
    pub async fn start(&self) -> bool {
        self.health.start_monitoring().await
    }

    /// Stop background work and wait for it to finish.
    ///
    /// # Errors
    /// Propagates the health monitor's shutdown error.
    pub async fn shutdown(&self) -> Result<()> {
        self.health.stop_monitoring().await?;
        info!("Assist context shut down");
        Ok(())
    }
}

fn retry_config(settings: &RetrySettings) -> Result<RetryConfig> {
    let backoff: BackoffStrategy = settings
        .strategy
        .parse()
        .map_err(|e| AssistError::Config(format!("retry.strategy: {e}")))?;

    RetryConfig::builder()
        .max_attempts(settings.max_attempts)
        .base_delay(Duration::from_millis(settings.base_delay_ms))
        .max_delay(Duration::from_millis(settings.max_delay_ms))
        .backoff(backoff)
        .jitter_range(settings.jitter_range)
        .build()
        .map_err(|e| AssistError::Config(format!("retry: {e}")))
}

#[cfg(test)]
mod tests {
    use assistkit_common::resilience::KindSet;

    use super::*;
    use crate::health::{HealthCheck, HealthStatus};

    #[test]
    fn test_new_builds_components_from_config() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 4;
        config.retry.strategy = "linear".to_string();
        config.metrics.max_timing_samples = 7;

        let context = AssistContext::new(config).unwrap();

        assert_eq!(context.breakers().names(), vec!["composio", "openai", "slack"]);
        assert_eq!(context.retry().config().max_attempts, 4);
        assert_eq!(context.retry().config().backoff_strategy, BackoffStrategy::Linear);
        assert_eq!(context.retry().config().retriable, KindSet::Any);
        assert_eq!(context.retry().operation(), "default");
        assert_eq!(context.health().check_interval(), Duration::from_secs(30));
        assert_eq!(context.api_latency_threshold(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.monitoring.check_interval_secs = 0;
        assert!(matches!(AssistContext::new(config), Err(AssistError::Config(_))));
    }

    #[tokio::test]
    async fn test_health_rounds_feed_context_metrics() {
        let context = AssistContext::new(AppConfig::default()).unwrap();
        context.health().register_check("database", || {
            Ok(HealthCheck::healthy("database", "Database connection successful"))
        });

        context.health().run_all_checks().await;

        assert_eq!(context.health().get_overall_health().status, HealthStatus::Healthy);
        assert_eq!(context.metrics().counter("health.rounds", &[]), Some(1.0));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let context = AssistContext::new(AppConfig::default()).unwrap();

        assert!(context.start().await);
        assert!(!context.start().await);
        assert!(context.health().is_running());

        context.shutdown().await.unwrap();
        assert!(!context.health().is_running());
    }
}
