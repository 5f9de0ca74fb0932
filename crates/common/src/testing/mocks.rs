//! Scripted operations for exercising retry and breaker logic

#![allow(clippy::missing_errors_doc)]

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{ErrorClassification, ErrorKind, ErrorSeverity};

/// Error raised by [`FlakyOperation`]
///
/// Carries the kind it was scripted with and the call number that produced
/// it, so tests can tell which attempt's error surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError {
    pub kind: ErrorKind,
    pub attempt: u32,
    pub retriable: bool,
}

impl TestError {
    pub fn new(kind: ErrorKind, attempt: u32) -> Self {
        Self { kind, attempt, retriable: false }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure on call {}", self.kind, self.attempt)
    }
}

impl std::error::Error for TestError {}

impl ErrorClassification for TestError {
    fn error_kind(&self) -> ErrorKind {
        self.kind
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Medium
    }

    fn retry_possible(&self) -> bool {
        self.retriable
    }
}

/// Operation that fails `failures` times, then returns its call number
///
/// Clones share the call counter.
#[derive(Debug, Clone)]
pub struct FlakyOperation {
    calls: Arc<AtomicU32>,
    failures: u32,
    kind: ErrorKind,
    retriable: bool,
}

impl FlakyOperation {
    pub fn new(failures: u32, kind: ErrorKind) -> Self {
        Self { calls: Arc::new(AtomicU32::new(0)), failures, kind, retriable: false }
    }

    pub fn always_failing(kind: ErrorKind) -> Self {
        Self::new(u32::MAX, kind)
    }

    pub fn succeeding() -> Self {
        Self::new(0, ErrorKind::Unknown)
    }

    /// Errors produced from now on declare themselves retriable.
    #[must_use]
    pub fn self_retriable(mut self) -> Self {
        self.retriable = true;
        self
    }

    pub fn invoke(&self) -> Result<u32, TestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(TestError { kind: self.kind, attempt: call, retriable: self.retriable })
        } else {
            Ok(call)
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}
