//! Resilience and metrics benchmarks
//!
//! Measures backoff computation, breaker admission on the async path and
//! metrics recording.
//!
//! Run with: `cargo bench --bench resilience_bench -p assistkit-common`

use std::time::Duration;

use assistkit_common::error::AppError;
use assistkit_common::observability::MetricsCollector;
use assistkit_common::resilience::{
    BackoffStrategy, CircuitBreaker, CircuitBreakerConfig, MockClock, ResilienceError,
    RetryConfig,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Builder as RuntimeBuilder;

// ============================================================================
// Backoff
// ============================================================================

fn bench_backoff_calculations(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry_backoff");

    for strategy in [
        BackoffStrategy::Fixed,
        BackoffStrategy::Linear,
        BackoffStrategy::Exponential,
        BackoffStrategy::ExponentialJitter,
    ] {
        let config = RetryConfig::builder()
            .backoff(strategy)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(30))
            .build()
            .expect("valid retry config for benchmarks");

        group.bench_with_input(BenchmarkId::from_parameter(strategy), &config, |b, config| {
            b.iter(|| {
                for attempt in 1..=10 {
                    black_box(config.calculate_delay(black_box(attempt)));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Circuit Breaker
// ============================================================================

fn bench_breaker_async_paths(c: &mut Criterion) {
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime for benchmarks");
    let mut group = c.benchmark_group("circuit_breaker_async");

    group.bench_function("closed_success", |b| {
        let breaker = CircuitBreaker::new("bench", CircuitBreakerConfig::default())
            .expect("valid breaker config");
        b.iter(|| {
            let result: Result<u32, ResilienceError<AppError>> =
                runtime.block_on(breaker.call_async(|| async { Ok(1) }));
            black_box(result)
        });
    });

    group.bench_function("open_rejection", |b| {
        let breaker = CircuitBreakerConfig::builder()
            .failure_threshold(1)
            .clock(MockClock::new())
            .build("bench")
            .expect("valid breaker config");
        let _ = runtime
            .block_on(breaker.call_async(|| async { Err::<(), _>(AppError::connection("down")) }));

        b.iter(|| {
            let result: Result<(), ResilienceError<AppError>> =
                runtime.block_on(breaker.call_async(|| async { Ok(()) }));
            black_box(result)
        });
    });

    group.finish();
}

// ============================================================================
// Metrics
// ============================================================================

fn bench_metrics_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    let metrics = MetricsCollector::new();

    group.bench_function("increment_untagged", |b| {
        b.iter(|| metrics.increment(black_box("messages"), 1.0, &[]));
    });

    group.bench_function("timing_tagged", |b| {
        b.iter(|| {
            metrics.timing(
                black_box("api.latency"),
                black_box(42.0),
                &[("service", "slack"), ("endpoint", "chat.postMessage")],
            );
        });
    });

    group.bench_function("summary_with_full_windows", |b| {
        for i in 0..100 {
            metrics.timing("summary.source", f64::from(i), &[]);
        }
        b.iter(|| black_box(metrics.get_metrics_summary()));
    });

    group.finish();
}

criterion_group!(
    resilience,
    bench_backoff_calculations,
    bench_breaker_async_paths,
    bench_metrics_recording
);
criterion_main!(resilience);
