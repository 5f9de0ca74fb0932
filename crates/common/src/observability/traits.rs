//! Recording seam between instrumented components and the metrics store
//!
//! Components that emit metrics (the health monitor, application handlers)
//! depend on [`MetricsRecorder`] rather than on
//! [`MetricsCollector`](super::MetricsCollector) so they can be run with
//! metrics disabled.

use std::fmt::Debug;
use std::sync::Arc;

/// Sink for counter, gauge and timing updates
pub trait MetricsRecorder: Send + Sync + Debug {
    /// Add one to a counter
    fn increment_counter(&self, name: &str, tags: &[(&str, &str)]);

    /// Set a gauge
    fn record_gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]);

    /// Record a duration in milliseconds
    fn record_timing(&self, name: &str, duration_ms: f64, tags: &[(&str, &str)]);
}

impl<T: MetricsRecorder + ?Sized> MetricsRecorder for Arc<T> {
    fn increment_counter(&self, name: &str, tags: &[(&str, &str)]) {
        (**self).increment_counter(name, tags);
    }

    fn record_gauge(&self, name: &str, value: f64, tags: &[(&str, &str)]) {
        (**self).record_gauge(name, value, tags);
    }

    fn record_timing(&self, name: &str, duration_ms: f64, tags: &[(&str, &str)]) {
        (**self).record_timing(name, duration_ms, tags);
    }
}

/// Recorder that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRecorder;

impl MetricsRecorder for NoOpRecorder {
    fn increment_counter(&self, _name: &str, _tags: &[(&str, &str)]) {}

    fn record_gauge(&self, _name: &str, _value: f64, _tags: &[(&str, &str)]) {}

    fn record_timing(&self, _name: &str, _duration_ms: f64, _tags: &[(&str, &str)]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MetricsCollector;

    #[test]
    fn test_collector_through_trait_object() {
        let collector = Arc::new(MetricsCollector::new());
        let recorder: Arc<dyn MetricsRecorder> = collector.clone();

        recorder.increment_counter("health.rounds", &[]);
        recorder.record_gauge("health.unhealthy", 2.0, &[]);
        recorder.record_timing("health.check", 12.5, &[("check", "database")]);

        assert_eq!(collector.counter("health.rounds", &[]), Some(1.0));
        assert_eq!(collector.gauge_value("health.unhealthy", &[]), Some(2.0));
        assert_eq!(collector.timing_samples("health.check", &[("check", "database")]), vec![12.5]);
    }

    #[test]
    fn test_noop_recorder_accepts_everything() {
        let recorder = NoOpRecorder;
        recorder.increment_counter("x", &[]);
        recorder.record_gauge("x", 1.0, &[]);
        recorder.record_timing("x", 1.0, &[]);
    }
}
