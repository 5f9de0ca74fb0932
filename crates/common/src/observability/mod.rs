//! Observability primitives: the metrics store and its recording seam
//!
//! Structured logging itself goes straight through `tracing`; subscriber
//! installation lives in the infra crate.

pub mod metrics;
pub mod traits;

pub use metrics::{
    metric_key, MetricPoint, MetricsCollector, MetricsSummary, TimerGuard, TimerStats,
};
pub use traits::{MetricsRecorder, NoOpRecorder};
