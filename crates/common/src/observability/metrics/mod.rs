//! In-process metrics store
//!
//! [`MetricsCollector`] keeps counters, gauges and bounded timing windows
//! keyed by metric name plus a sorted tag set, together with a bounded
//! per-name history of every recorded point. [`TimerGuard`] measures a scope
//! and records its duration when dropped.

mod collector;
mod timer;

pub use collector::{
    metric_key, MetricPoint, MetricsCollector, MetricsSummary, TimerStats,
    DEFAULT_MAX_POINTS_PER_METRIC, DEFAULT_MAX_TIMING_SAMPLES,
};
pub use timer::TimerGuard;
