//! Application configuration tree
//!
//! Every section deserializes with defaults, so a config file only has to
//! name the values it overrides. [`AppConfig::validate`] enforces the ranges
//! the resilience primitives require before anything is constructed from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BACKOFF_STRATEGIES, COMPOSIO_BREAKER, DEFAULT_API_LATENCY_THRESHOLD_MS, DEFAULT_APP_NAME,
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_ENVIRONMENT, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_HEALTH_CHECK_INTERVAL_SECS, DEFAULT_JITTER_RANGE, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_POINTS_PER_METRIC, DEFAULT_MAX_TIMING_SAMPLES, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_RECOVERY_TIMEOUT_SECS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS,
    DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_RETRY_STRATEGY, DEFAULT_SUCCESS_THRESHOLD, LOG_LEVELS,
    OPENAI_BREAKER, SLACK_BREAKER,
};
use crate::errors::{AssistError, Result};

/// Root configuration for an AssistKit process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitoring: MonitoringConfig,
    pub metrics: MetricsConfig,
    pub retry: RetrySettings,
    pub breakers: BTreeMap<String, BreakerSettings>,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitoring: MonitoringConfig::default(),
            metrics: MetricsConfig::default(),
            retry: RetrySettings::default(),
            breakers: BreakerSettings::presets(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Check every section, returning the first violation found.
    ///
    /// # Errors
    /// Returns `AssistError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.monitoring.validate()?;
        self.metrics.validate()?;
        self.retry.validate()?;
        for (name, breaker) in &self.breakers {
            breaker.validate(name)?;
        }
        self.logging.validate()
    }
}

/// Health monitoring section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Seconds between monitoring rounds
    pub check_interval_secs: u64,
    /// Upper bound on a single probe invocation
    pub probe_timeout_ms: u64,
    /// API probes slower than this report DEGRADED
    pub api_latency_threshold_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            api_latency_threshold_ms: DEFAULT_API_LATENCY_THRESHOLD_MS,
        }
    }
}

impl MonitoringConfig {
    fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(config_error("monitoring.check_interval_secs must be greater than 0"));
        }
        if self.probe_timeout_ms == 0 {
            return Err(config_error("monitoring.probe_timeout_ms must be greater than 0"));
        }
        Ok(())
    }
}

/// Metrics collector section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Ring buffer capacity of the per-name history
    pub max_points_per_metric: usize,
    /// Most recent timing samples kept per key
    pub max_timing_samples: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_points_per_metric: DEFAULT_MAX_POINTS_PER_METRIC,
            max_timing_samples: DEFAULT_MAX_TIMING_SAMPLES,
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_points_per_metric == 0 {
            return Err(config_error("metrics.max_points_per_metric must be greater than 0"));
        }
        if self.max_timing_samples == 0 {
            return Err(config_error("metrics.max_timing_samples must be greater than 0"));
        }
        Ok(())
    }
}

/// Default retry policy section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// One of `fixed`, `linear`, `exponential`, `exponential_jitter`
    pub strategy: String,
    pub jitter_range: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            strategy: DEFAULT_RETRY_STRATEGY.to_string(),
            jitter_range: DEFAULT_JITTER_RANGE,
        }
    }
}

impl RetrySettings {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(config_error("retry.max_attempts must be at least 1"));
        }
        if self.base_delay_ms == 0 {
            return Err(config_error("retry.base_delay_ms must be greater than 0"));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(config_error("retry.max_delay_ms must be >= retry.base_delay_ms"));
        }
        if !(0.0..=1.0).contains(&self.jitter_range) {
            return Err(config_error("retry.jitter_range must be within [0, 1]"));
        }
        if !BACKOFF_STRATEGIES.contains(&self.strategy.as_str()) {
            return Err(config_error(format!(
                "retry.strategy '{}' is not one of {}",
                self.strategy,
                BACKOFF_STRATEGIES.join(", ")
            )));
        }
        Ok(())
    }
}

/// Settings for one named circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub success_threshold: u32,
    pub timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_secs: DEFAULT_RECOVERY_TIMEOUT_SECS,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

impl BreakerSettings {
    /// The breakers every assistant process starts with.
    pub fn presets() -> BTreeMap<String, Self> {
        BTreeMap::from([
            (
                OPENAI_BREAKER.to_string(),
                Self {
                    failure_threshold: 3,
                    recovery_timeout_secs: 30,
                    timeout_secs: 120,
                    ..Self::default()
                },
            ),
            (
                COMPOSIO_BREAKER.to_string(),
                Self {
                    failure_threshold: 5,
                    recovery_timeout_secs: 60,
                    timeout_secs: 60,
                    ..Self::default()
                },
            ),
            (
                SLACK_BREAKER.to_string(),
                Self {
                    failure_threshold: 5,
                    recovery_timeout_secs: 30,
                    timeout_secs: 30,
                    ..Self::default()
                },
            ),
        ])
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(config_error(format!(
                "breakers.{name}.failure_threshold must be at least 1"
            )));
        }
        if self.success_threshold == 0 {
            return Err(config_error(format!(
                "breakers.{name}.success_threshold must be at least 1"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(config_error(format!("breakers.{name}.timeout_secs must be greater than 0")));
        }
        Ok(())
    }
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    pub app_name: String,
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
            app_name: DEFAULT_APP_NAME.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        let level = self.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(config_error(format!("logging.level '{}' is not recognised", self.level)));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> AssistError {
    AssistError::Config(message.into())
}
