//! Health monitoring with explicit lifecycle management
//!
//! The monitor owns a set of named probes and the most recent result of each.
//! A background worker runs every probe once per interval:
//! - Each probe runs on the blocking pool, bounded by `probe_timeout`, so one
//!   hanging dependency cannot hold up the rest of the round
//! - Probe errors, panics and timeouts become UNHEALTHY results
//! - The overall verdict is derived from stored results only
//! - Listeners hear about overall status transitions
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use assistkit_infra::health::{probes, HealthMonitor};
//!
//! # async fn example() -> assistkit_domain::Result<()> {
//! let monitor = HealthMonitor::new(Duration::from_secs(30));
//! monitor.register_check("database", probes::database_probe(|| Ok(())));
//!
//! monitor.start_monitoring().await;
//! // ... serve requests ...
//! monitor.stop_monitoring().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assistkit_common::observability::{MetricsRecorder, NoOpRecorder};
use assistkit_domain::constants::{DEFAULT_PROBE_TIMEOUT_MS, OVERALL_HEALTH_CHECK_NAME};
use assistkit_domain::{AssistError, MonitoringConfig, Result};
use chrono::Utc;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::types::{HealthCheck, HealthStatus, HealthStatusListener};

/// Zero-argument health probe
///
/// Returning `Err` is equivalent to the probe raising: the monitor records an
/// UNHEALTHY result carrying the error message.
pub type Probe = Arc<dyn Fn() -> anyhow::Result<HealthCheck> + Send + Sync>;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest interval the worker will tick at.
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Probes and their latest results, shared with the worker
#[derive(Default)]
struct Registry {
    checks: RwLock<BTreeMap<String, Probe>>,
    last_results: RwLock<BTreeMap<String, HealthCheck>>,
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic health monitor
///
/// All methods take `&self`; share the monitor behind an `Arc`.
pub struct HealthMonitor {
    registry: Arc<Registry>,
    check_interval: Duration,
    probe_timeout: Duration,
    listener: Option<Arc<dyn HealthStatusListener>>,
    metrics: Arc<dyn MetricsRecorder>,
    task: Mutex<Option<MonitorTask>>,
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("checks", &self.check_names())
            .field("check_interval", &self.check_interval)
            .field("probe_timeout", &self.probe_timeout)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    /// Create a monitor that runs a round every `check_interval`
    ///
    /// Intervals shorter than 1ms, including zero, are raised to 1ms.
    pub fn new(check_interval: Duration) -> Self {
        if check_interval < MIN_CHECK_INTERVAL {
            warn!(
                requested_ms = check_interval.as_secs_f64() * 1000.0,
                "Health check interval below minimum, using 1ms"
            );
        }
        let check_interval = check_interval.max(MIN_CHECK_INTERVAL);
        Self {
            registry: Arc::new(Registry::default()),
            check_interval,
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            listener: None,
            metrics: Arc::new(NoOpRecorder),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &MonitoringConfig) -> Self {
        Self::new(Duration::from_secs(config.check_interval_secs))
            .with_probe_timeout(Duration::from_millis(config.probe_timeout_ms))
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn HealthStatusListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Record per-check timings and round counters into `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Install `probe` under `name`, replacing any previous probe.
    ///
    /// The probe is not run until the next round.
    pub fn register_check<F>(&self, name: impl Into<String>, probe: F)
    where
        F: Fn() -> anyhow::Result<HealthCheck> + Send + Sync + 'static,
    {
        let name = name.into();
        self.registry.checks.write().insert(name.clone(), Arc::new(probe));
        info!(check = %name, "Registered health check");
    }

    pub fn check_names(&self) -> Vec<String> {
        self.registry.checks.read().keys().cloned().collect()
    }

    /// Run every registered probe once and store the results.
    ///
    /// Never fails: probe failures are returned as UNHEALTHY results.
    pub async fn run_all_checks(&self) -> BTreeMap<String, HealthCheck> {
        run_round(&self.registry, self.probe_timeout, self.metrics.as_ref()).await
    }

    /// Overall verdict from the latest stored results
    pub fn get_overall_health(&self) -> HealthCheck {
        overall_health(&self.registry.last_results.read())
    }

    /// Latest result per check
    pub fn last_results(&self) -> BTreeMap<String, HealthCheck> {
        self.registry.last_results.read().clone()
    }

    /// Start the background loop.
    ///
    /// Returns `false` without doing anything if the loop is already running.
    /// The first round starts immediately.
    pub async fn start_monitoring(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Health monitoring already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let worker = HealthWorker {
            registry: Arc::clone(&self.registry),
            interval: self.check_interval,
            probe_timeout: self.probe_timeout,
            listener: self.listener.clone(),
            metrics: Arc::clone(&self.metrics),
        };

        info!(
            interval_secs = self.check_interval.as_secs_f64(),
            checks = self.registry.checks.read().len(),
            "Started health monitoring"
        );

        let handle = tokio::spawn(worker.run(cancel.clone()));
        *task = Some(MonitorTask { cancel, handle });
        true
    }

    /// Stop the background loop and wait for it to finish.
    ///
    /// Calling this while the loop is not running is a no-op.
    ///
    /// # Errors
    /// Returns `AssistError::Internal` if the worker does not stop within five
    /// seconds (it is then aborted) or if it panicked.
    pub async fn stop_monitoring(&self) -> Result<()> {
        let Some(MonitorTask { cancel, mut handle }) = self.task.lock().take() else {
            return Ok(());
        };
        cancel.cancel();

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => {
                info!("Stopped health monitoring");
                Ok(())
            }
            Ok(Err(e)) => Err(AssistError::Internal(format!("Health monitor task failed: {e}"))),
            Err(_) => {
                handle.abort();
                Err(AssistError::Internal("Health monitor shutdown timeout".to_string()))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.cancel.is_cancelled() && !t.handle.is_finished())
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

/// Background loop state, detached from the monitor handle
struct HealthWorker {
    registry: Arc<Registry>,
    interval: Duration,
    probe_timeout: Duration,
    listener: Option<Arc<dyn HealthStatusListener>>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl HealthWorker {
    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut previous: Option<HealthStatus> = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = run_round(&self.registry, self.probe_timeout, self.metrics.as_ref()) => {}
            }

            let overall = overall_health(&self.registry.last_results.read());
            if previous != Some(overall.status) {
                info!(
                    previous_status = ?previous,
                    new_status = %overall.status,
                    message = %overall.message,
                    "Overall health changed"
                );
                previous = Some(overall.status);
                if let Some(listener) = &self.listener {
                    listener.on_health_changed(overall).await;
                }
            }
        }

        debug!("Health monitor worker shutting down");
    }
}

async fn run_round(
    registry: &Registry,
    probe_timeout: Duration,
    metrics: &dyn MetricsRecorder,
) -> BTreeMap<String, HealthCheck> {
    let probes: Vec<(String, Probe)> = registry
        .checks
        .read()
        .iter()
        .map(|(name, probe)| (name.clone(), Arc::clone(probe)))
        .collect();

    let results: BTreeMap<String, HealthCheck> =
        join_all(probes.into_iter().map(|(name, probe)| run_probe(name, probe, probe_timeout)))
            .await
            .into_iter()
            .collect();

    let unhealthy = results.values().filter(|c| c.status == HealthStatus::Unhealthy).count();
    for (name, check) in &results {
        if let Some(ms) = check.response_time_ms {
            metrics.record_timing("health.check", ms, &[("check", name.as_str())]);
        }
    }
    metrics.increment_counter("health.rounds", &[]);
    metrics.record_gauge("health.unhealthy", unhealthy as f64, &[]);

    registry.last_results.write().extend(results.clone());
    results
}

async fn run_probe(name: String, probe: Probe, probe_timeout: Duration) -> (String, HealthCheck) {
    let started = Instant::now();
    let outcome = tokio::time::timeout(probe_timeout, tokio::task::spawn_blocking(move || probe()))
        .await;
    let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut check = match outcome {
        Ok(Ok(Ok(check))) => check,
        Ok(Ok(Err(e))) => {
            error!(check = %name, error = %e, "Health check '{name}' failed: {e}");
            HealthCheck::unhealthy(name.as_str(), format!("Check failed: {e}"))
        }
        Ok(Err(join_error)) => {
            error!(check = %name, error = %join_error, "Health check '{name}' panicked");
            HealthCheck::unhealthy(name.as_str(), format!("Check failed: {join_error}"))
        }
        Err(_) => {
            let ms = probe_timeout.as_millis();
            warn!(check = %name, timeout_ms = ms, "Health check '{name}' timed out");
            HealthCheck::unhealthy(name.as_str(), format!("Check failed: timed out after {ms}ms"))
        }
    };
    check.response_time_ms = Some(response_time_ms);
    check.last_checked = Some(Utc::now());

    match check.status {
        HealthStatus::Healthy => debug!(
            check = %name,
            status = %check.status,
            response_time_ms,
            "Health check completed"
        ),
        HealthStatus::Degraded | HealthStatus::Unhealthy => warn!(
            check = %name,
            status = %check.status,
            response_time_ms,
            message = %check.message,
            "Health check completed"
        ),
    }

    (name, check)
}

/// Derive the overall verdict from stored results.
pub(crate) fn overall_health(results: &BTreeMap<String, HealthCheck>) -> HealthCheck {
    if results.is_empty() {
        return HealthCheck::unhealthy(OVERALL_HEALTH_CHECK_NAME, "No health checks have been run");
    }

    let names_with = |status: HealthStatus| {
        results
            .iter()
            .filter(|(_, check)| check.status == status)
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let (status, message) = if results.values().all(HealthCheck::is_healthy) {
        (HealthStatus::Healthy, "All systems healthy".to_string())
    } else if results.values().any(|c| c.status == HealthStatus::Unhealthy) {
        (HealthStatus::Unhealthy, format!("Unhealthy systems: {}", names_with(HealthStatus::Unhealthy)))
    } else {
        (HealthStatus::Degraded, format!("Degraded systems: {}", names_with(HealthStatus::Degraded)))
    };

    let mut overall = HealthCheck::new(OVERALL_HEALTH_CHECK_NAME, status, message)
        .with_detail("individual_checks", results.len());
    overall.last_checked = Some(Utc::now());
    overall
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn stored(entries: &[(&str, HealthStatus)]) -> BTreeMap<String, HealthCheck> {
        entries
            .iter()
            .map(|(name, status)| ((*name).to_string(), HealthCheck::new(*name, *status, "x")))
            .collect()
    }

    #[test]
    fn test_overall_without_results() {
        let overall = overall_health(&BTreeMap::new());
        assert_eq!(overall.name, "overall");
        assert_eq!(overall.status, HealthStatus::Unhealthy);
        assert_eq!(overall.message, "No health checks have been run");
        assert!(overall.details.is_empty());
    }

    #[test]
    fn test_overall_all_healthy() {
        let overall =
            overall_health(&stored(&[("a", HealthStatus::Healthy), ("b", HealthStatus::Healthy)]));
        assert_eq!(overall.status, HealthStatus::Healthy);
        assert_eq!(overall.message, "All systems healthy");
        assert_eq!(overall.details["individual_checks"], 2);
    }

    /// Validates verdict precedence for mixed results.
    ///
    /// Assertions:
    /// - Confirms a degraded check alone yields DEGRADED naming it.
    /// - Confirms any unhealthy check wins and only unhealthy names are
    ///   listed.
    #[test]
    fn test_overall_mixed_results() {
        let overall =
            overall_health(&stored(&[("a", HealthStatus::Healthy), ("b", HealthStatus::Degraded)]));
        assert_eq!(overall.status, HealthStatus::Degraded);
        assert_eq!(overall.message, "Degraded systems: b");

        let overall = overall_health(&stored(&[
            ("a", HealthStatus::Healthy),
            ("b", HealthStatus::Unhealthy),
            ("c", HealthStatus::Degraded),
            ("d", HealthStatus::Unhealthy),
        ]));
        assert_eq!(overall.status, HealthStatus::Unhealthy);
        assert_eq!(overall.message, "Unhealthy systems: b, d");
    }

    #[tokio::test]
    async fn test_register_does_not_run_probe() {
        let monitor = HealthMonitor::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        monitor.register_check("cache", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HealthCheck::healthy("cache", "ok"))
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.get_overall_health().message, "No health checks have been run");

        monitor.run_all_checks().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.get_overall_health().status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_failing_probe_becomes_unhealthy() {
        let monitor = HealthMonitor::new(Duration::from_secs(30));
        monitor.register_check("notion", || Err(anyhow::anyhow!("connection refused")));

        let results = monitor.run_all_checks().await;
        let check = &results["notion"];
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert_eq!(check.message, "Check failed: connection refused");
        assert!(check.last_checked.is_some());
        assert!(check.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_panicking_probe_is_contained() {
        let monitor = HealthMonitor::new(Duration::from_secs(30));
        monitor.register_check("broken", || panic!("probe bug"));
        monitor.register_check("ok", || Ok(HealthCheck::healthy("ok", "fine")));

        let results = monitor.run_all_checks().await;
        assert_eq!(results["broken"].status, HealthStatus::Unhealthy);
        assert!(results["broken"].message.starts_with("Check failed:"));
        assert_eq!(results["ok"].status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_round_records_metrics() {
        let collector = Arc::new(assistkit_common::MetricsCollector::new());
        let monitor = HealthMonitor::new(Duration::from_secs(30)).with_metrics(collector.clone());
        monitor.register_check("database", || Ok(HealthCheck::healthy("database", "ok")));
        monitor.register_check("slack_api", || Err(anyhow::anyhow!("503")));

        monitor.run_all_checks().await;

        assert_eq!(collector.counter("health.rounds", &[]), Some(1.0));
        assert_eq!(collector.gauge_value("health.unhealthy", &[]), Some(1.0));
        assert_eq!(collector.timing_samples("health.check", &[("check", "database")]).len(), 1);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let monitor = HealthMonitor::new(Duration::from_secs(30));
        assert!(!monitor.is_running());
        monitor.stop_monitoring().await.unwrap();
    }

    #[test]
    fn test_from_config() {
        let config = MonitoringConfig {
            check_interval_secs: 15,
            probe_timeout_ms: 2_500,
            ..MonitoringConfig::default()
        };
        let monitor = HealthMonitor::from_config(&config);
        assert_eq!(monitor.check_interval(), Duration::from_secs(15));
        assert_eq!(monitor.probe_timeout(), Duration::from_millis(2_500));
    }

    #[test]
    fn test_zero_interval_is_raised_to_minimum() {
        let monitor = HealthMonitor::new(Duration::ZERO);
        assert_eq!(monitor.check_interval(), MIN_CHECK_INTERVAL);

        let config = MonitoringConfig {
            check_interval_secs: 0,
            ..MonitoringConfig::default()
        };
        assert_eq!(HealthMonitor::from_config(&config).check_interval(), MIN_CHECK_INTERVAL);
    }

    /// Validates that a zero interval still yields a working worker.
    ///
    /// Assertions:
    /// - Confirms the worker keeps running and completes rounds.
    /// - Confirms stop succeeds instead of reporting a failed task.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zero_interval_worker_runs_rounds() {
        let monitor = HealthMonitor::new(Duration::ZERO);
        monitor.register_check("database", || Ok(HealthCheck::healthy("database", "ok")));

        assert!(monitor.start_monitoring().await);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(monitor.is_running());
        assert_eq!(monitor.last_results().len(), 1);
        monitor.stop_monitoring().await.unwrap();
        assert!(!monitor.is_running());
    }
}
