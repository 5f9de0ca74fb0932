//! Helpers for waiting on background tasks in async tests
//!
//! Both helpers measure time with `tokio::time`, so they behave the same on
//! a paused test clock as on a real one.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Poll an async condition until it returns true or times out
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "test-utils")]
/// # {
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use assistkit_common::testing::poll_until;
///
/// #[tokio::test]
/// async fn test_poll() {
///     let ready = Arc::new(AtomicBool::new(false));
///     let flag = ready.clone();
///
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(50)).await;
///         flag.store(true, Ordering::SeqCst);
///     });
///
///     let result = poll_until(Duration::from_secs(1), Duration::from_millis(10), || {
///         let ready = ready.clone();
///         async move { ready.load(Ordering::SeqCst) }
///     })
///     .await;
///
///     assert!(result);
/// }
/// # }
/// ```
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Wait until `counter` reaches at least `target`.
pub async fn wait_for_count(counter: &AtomicU32, target: u32, timeout: Duration) -> bool {
    poll_until(timeout, Duration::from_millis(5), move || async move {
        counter.load(Ordering::SeqCst) >= target
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use super::*;

    /// Validates `poll_until` against a background task.
    ///
    /// Assertions:
    /// - Ensures the condition is observed once the task flips the flag.
    #[tokio::test(start_paused = true)]
    async fn test_poll_until_succeeds() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = flag.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let result = poll_until(Duration::from_secs(1), Duration::from_millis(10), || {
            let flag = flag.clone();
            async move { flag.load(Ordering::SeqCst) }
        })
        .await;

        assert!(result);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out() {
        let result =
            poll_until(Duration::from_millis(50), Duration::from_millis(10), || async { false })
                .await;

        assert!(!result);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_count() {
        let counter = AtomicU32::new(3);
        assert!(wait_for_count(&counter, 3, Duration::from_millis(10)).await);
        assert!(!wait_for_count(&counter, 4, Duration::from_millis(10)).await);
    }
}
