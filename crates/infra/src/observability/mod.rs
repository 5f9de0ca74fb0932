//! Process-level observability wiring
//!
//! - [`logging::init`] installs the global tracing subscriber
//! - [`metrics_from_config`] sizes the shared metrics collector

pub mod logging;

use assistkit_common::observability::MetricsCollector;
use assistkit_domain::MetricsConfig;

/// Build the process metrics collector from its configuration section
pub fn metrics_from_config(config: &MetricsConfig) -> MetricsCollector {
    MetricsCollector::with_capacity(config.max_points_per_metric, config.max_timing_samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_from_config_applies_capacities() {
        let metrics = metrics_from_config(&MetricsConfig {
            max_points_per_metric: 3,
            max_timing_samples: 2,
        });

        for i in 0..5 {
            metrics.timing("render", f64::from(i), &[]);
        }

        assert_eq!(metrics.timing_samples("render", &[]), vec![3.0, 4.0]);
        assert_eq!(metrics.history("render").len(), 3);
    }

    /// Validates that the default config sizes match the collector's own
    /// defaults.
    ///
    /// Assertions:
    /// - Confirms both crates agree on the history and timing-window bounds.
    #[test]
    fn test_default_capacities_agree() {
        use assistkit_common::observability::metrics::{
            DEFAULT_MAX_POINTS_PER_METRIC, DEFAULT_MAX_TIMING_SAMPLES,
        };
        use assistkit_domain::constants;

        assert_eq!(constants::DEFAULT_MAX_POINTS_PER_METRIC, DEFAULT_MAX_POINTS_PER_METRIC);
        assert_eq!(constants::DEFAULT_MAX_TIMING_SAMPLES, DEFAULT_MAX_TIMING_SAMPLES);

        let config = MetricsConfig::default();
        assert_eq!(config.max_points_per_metric, DEFAULT_MAX_POINTS_PER_METRIC);
        assert_eq!(config.max_timing_samples, DEFAULT_MAX_TIMING_SAMPLES);
    }
}
