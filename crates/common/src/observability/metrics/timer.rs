use std::time::{Duration, Instant};

use super::MetricsCollector;

/// Scoped timing measurement
///
/// Records the elapsed wall-clock time into its collector exactly once:
/// either through [`stop`](Self::stop) or when dropped. Dropping during a
/// panic still records, so failing scopes are measured too.
#[must_use = "the timer records when dropped; binding it to `_` drops it immediately"]
#[derive(Debug)]
pub struct TimerGuard<'a> {
    collector: &'a MetricsCollector,
    name: String,
    tags: Vec<(String, String)>,
    start: Instant,
    recorded: bool,
}

impl<'a> TimerGuard<'a> {
    pub(super) fn start(collector: &'a MetricsCollector, name: &str, tags: &[(&str, &str)]) -> Self {
        Self {
            collector,
            name: name.to_string(),
            tags: tags.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            start: Instant::now(),
            recorded: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record now and return the recorded duration in milliseconds.
    pub fn stop(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        if !self.recorded {
            self.recorded = true;
            let tags: Vec<(&str, &str)> =
                self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            self.collector.timing(&self.name, elapsed_ms, &tags);
        }
        elapsed_ms
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.record();
    }
}
