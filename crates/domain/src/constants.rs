//! Application constants
//!
//! Centralized location for the defaults used by the configuration tree and
//! the resilience presets.

// Health monitoring
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_API_LATENCY_THRESHOLD_MS: u64 = 5_000;
pub const OVERALL_HEALTH_CHECK_NAME: &str = "overall";

// Metrics
pub const DEFAULT_MAX_POINTS_PER_METRIC: usize = 1000;
pub const DEFAULT_MAX_TIMING_SAMPLES: usize = 100;

// Retry
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 60_000;
pub const DEFAULT_RETRY_STRATEGY: &str = "exponential_jitter";
pub const DEFAULT_JITTER_RANGE: f64 = 0.1;
pub const BACKOFF_STRATEGIES: [&str; 4] = ["fixed", "linear", "exponential", "exponential_jitter"];

// Circuit breakers
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RECOVERY_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

pub const OPENAI_BREAKER: &str = "openai";
pub const COMPOSIO_BREAKER: &str = "composio";
pub const SLACK_BREAKER: &str = "slack";

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_APP_NAME: &str = "assistkit";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
