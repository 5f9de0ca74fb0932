use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TimerGuard;
use crate::observability::traits::MetricsRecorder;

/// History points kept per metric name.
pub const DEFAULT_MAX_POINTS_PER_METRIC: usize = 1000;

/// Timing samples kept per metric key.
pub const DEFAULT_MAX_TIMING_SAMPLES: usize = 100;

/// One recorded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub tags: BTreeMap<String, String>,
}

/// Aggregates over one timing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStats {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

impl TimerStats {
    /// `None` for an empty window.
    fn from_samples(samples: &VecDeque<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<f64> = samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        Some(Self {
            count,
            avg: sum / count as f64,
            min: sorted[0],
            max: sorted[count - 1],
            p95: nearest_rank(&sorted, 95.0),
            p99: nearest_rank(&sorted, 99.0),
        })
    }
}

/// Nearest-rank percentile: `sorted[min(floor(p/100 * n), n - 1)]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let rank = (percentile / 100.0 * sorted.len() as f64).floor() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Snapshot returned by [`MetricsCollector::get_metrics_summary`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub counters: BTreeMap<String, f64>,
    pub gauges: BTreeMap<String, f64>,
    pub timers: BTreeMap<String, TimerStats>,
}

/// Storage key for a metric: `name` alone, or `name[k1=v1,k2=v2]` with tags
/// sorted by key.
///
/// Tags are not escaped. Values containing `,`, `=` or `]` can make two
/// different tag sets share a key, and a repeated tag key appears twice.
pub fn metric_key(name: &str, tags: &[(&str, &str)]) -> String {
    if tags.is_empty() {
        return name.to_string();
    }
    let mut sorted = tags.to_vec();
    sorted.sort_unstable();

    let mut key = String::with_capacity(name.len() + 2 + tags.len() * 16);
    key.push_str(name);
    key.push('[');
    for (i, (k, v)) in sorted.iter().enumerate() {
        if i > 0 {
            key.push(',');
        }
        let _ = write!(key, "{k}={v}");
    }
    key.push(']');
    key
}

#[derive(Debug, Default)]
struct MetricsState {
    counters: BTreeMap<String, f64>,
    gauges: BTreeMap<String, f64>,
    timers: BTreeMap<String, VecDeque<f64>>,
    history: HashMap<String, VecDeque<MetricPoint>>,
}

/// Thread-safe store of counters, gauges and timings
///
/// Every mutation happens under one lock, so concurrent increments of the
/// same counter are never lost. History is kept per metric name regardless
/// of tags; counters, gauges and timing windows are kept per tagged key.
#[derive(Debug)]
pub struct MetricsCollector {
    max_points_per_metric: usize,
    max_timing_samples: usize,
    state: Mutex<MetricsState>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_POINTS_PER_METRIC, DEFAULT_MAX_TIMING_SAMPLES)
    }

    /// Collector with custom bounds. Zero bounds are raised to one.
    pub fn with_capacity(max_points_per_metric: usize, max_timing_samples: usize) -> Self {
        Self {
            max_points_per_metric: max_points_per_metric.max(1),
            max_timing_samples: max_timing_samples.max(1),
            state: Mutex::new(MetricsState::default()),
        }
    }

    pub fn max_points_per_metric(&self) -> usize {
        self.max_points_per_metric
    }

    pub fn max_timing_samples(&self) -> usize {
        self.max_timing_samples
    }

    /// Add `value` to a counter and return its new total.
    pub fn increment(&self, name: &str, value: f64, tags: &[(&str, &str)]) -> f64 {
        let key = metric_key(name, tags);
        let mut state = self.state.lock();
        let total = {
            let counter = state.counters.entry(key).or_insert(0.0);
            *counter += value;
            *counter
        };
        self.push_history(&mut state, name, total, tags);
        total
    }

    /// Set a gauge to exactly `value`.
    pub fn gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        let key = metric_key(name, tags);
        let mut state = self.state.lock();
        state.gauges.insert(key, value);
        self.push_history(&mut state, name, value, tags);
    }

    /// Append a timing sample, evicting the oldest once the window is full.
    pub fn timing(&self, name: &str, duration_ms: f64, tags: &[(&str, &str)]) {
        let key = metric_key(name, tags);
        let mut state = self.state.lock();
        let window = state.timers.entry(key).or_default();
        if window.len() == self.max_timing_samples {
            window.pop_front();
        }
        window.push_back(duration_ms);
        self.push_history(&mut state, name, duration_ms, tags);
    }

    /// Start timing a scope; the duration is recorded when the guard drops.
    pub fn timer(&self, name: &str, tags: &[(&str, &str)]) -> TimerGuard<'_> {
        TimerGuard::start(self, name, tags)
    }

    /// Current counters, gauges and timing aggregates.
    pub fn get_metrics_summary(&self) -> MetricsSummary {
        let state = self.state.lock();
        MetricsSummary {
            counters: state.counters.clone(),
            gauges: state.gauges.clone(),
            timers: state
                .timers
                .iter()
                .filter_map(|(key, samples)| {
                    TimerStats::from_samples(samples).map(|stats| (key.clone(), stats))
                })
                .collect(),
        }
    }

    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> Option<f64> {
        self.state.lock().counters.get(&metric_key(name, tags)).copied()
    }

    pub fn gauge_value(&self, name: &str, tags: &[(&str, &str)]) -> Option<f64> {
        self.state.lock().gauges.get(&metric_key(name, tags)).copied()
    }

    /// Retained timing samples for a key, oldest first.
    pub fn timing_samples(&self, name: &str, tags: &[(&str, &str)]) -> Vec<f64> {
        self.state
            .lock()
            .timers
            .get(&metric_key(name, tags))
            .map(|window| window.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Recorded points for a metric name across all tag sets, oldest first.
    pub fn history(&self, name: &str) -> Vec<MetricPoint> {
        self.state
            .lock()
            .history
            .get(name)
            .map(|points| points.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every metric.
    pub fn reset(&self) {
        *self.state.lock() = MetricsState::default();
        debug!("Metrics collector reset");
    }

    fn push_history(&self, state: &mut MetricsState, name: &str, value: f64, tags: &[(&str, &str)]) {
        let points = state.history.entry(name.to_string()).or_default();
        if points.len() == self.max_points_per_metric {
            points.pop_front();
        }
        points.push_back(MetricPoint {
            timestamp: Utc::now(),
            value,
            tags: tags.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        });
    }
}

impl MetricsRecorder for MetricsCollector {
    fn increment_counter(&self, name: &str, tags: &[(&str, &str)]) {
        self.increment(name, 1.0, tags);
    }

    fn record_gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        self.gauge(name, value, tags);
    }

    fn record_timing(&self, name: &str, duration_ms: f64, tags: &[(&str, &str)]) {
        self.timing(name, duration_ms, tags);
    }
}
