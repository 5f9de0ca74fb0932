//! Standard probe factories
//!
//! Each factory wraps a caller-supplied connectivity test into a probe that
//! never fails: errors from the test are reported as UNHEALTHY results.

use std::time::{Duration, Instant};

use assistkit_domain::constants::DEFAULT_API_LATENCY_THRESHOLD_MS;

use super::types::HealthCheck;

/// Latency above which an otherwise successful API probe is DEGRADED
pub const DEFAULT_API_LATENCY_THRESHOLD: Duration =
    Duration::from_millis(DEFAULT_API_LATENCY_THRESHOLD_MS);

/// Probe named `database` around a trivial connection test
pub fn database_probe<F>(connect: F) -> impl Fn() -> anyhow::Result<HealthCheck> + Send + Sync
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    move || {
        let started = Instant::now();
        let check = match connect() {
            Ok(()) => HealthCheck::healthy("database", "Database connection successful")
                .with_response_time(elapsed_ms(started)),
            Err(e) => {
                HealthCheck::unhealthy("database", format!("Database connection failed: {e}"))
            }
        };
        Ok(check)
    }
}

/// Probe named `{api}_api` using the default latency threshold
pub fn api_probe<F>(api_name: &str, call: F) -> impl Fn() -> anyhow::Result<HealthCheck> + Send + Sync
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    api_probe_with_threshold(api_name, DEFAULT_API_LATENCY_THRESHOLD, call)
}

/// Probe named `{api}_api`; a successful call slower than `threshold` is
/// DEGRADED.
pub fn api_probe_with_threshold<F>(
    api_name: &str,
    threshold: Duration,
    call: F,
) -> impl Fn() -> anyhow::Result<HealthCheck> + Send + Sync
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    let api_name = api_name.to_string();
    let check_name = format!("{}_api", api_name.to_lowercase());
    let threshold_ms = threshold.as_secs_f64() * 1000.0;

    move || {
        let started = Instant::now();
        let check = match call() {
            Ok(()) => {
                let ms = elapsed_ms(started);
                let check = if ms > threshold_ms {
                    HealthCheck::degraded(
                        check_name.as_str(),
                        format!("{api_name} API responding slowly ({ms:.0}ms)"),
                    )
                } else {
                    HealthCheck::healthy(check_name.as_str(), format!("{api_name} API healthy"))
                };
                check.with_response_time(ms)
            }
            Err(e) => {
                HealthCheck::unhealthy(check_name.as_str(), format!("{api_name} API failed: {e}"))
            }
        };
        Ok(check)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
