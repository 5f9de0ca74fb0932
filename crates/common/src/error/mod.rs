//! Error taxonomy shared by the resilience and observability modules
//!
//! Retry decisions are data-driven: instead of inspecting concrete error
//! types, the retry engine asks every error for its [`ErrorKind`] and whether
//! it self-declares as retriable. Any error that should flow through a
//! [`RetryHandler`](crate::resilience::RetryHandler) implements
//! [`ErrorClassification`].
//!
//! # Components
//!
//! 1. **[`ErrorKind`]**: the coarse category of a failure (connection,
//!    timeout, validation, ...). Retry configs whitelist and blacklist kinds.
//! 2. **[`ErrorClassification`]**: the trait errors implement to expose their
//!    kind, severity and self-declared retriability.
//! 3. **[`ErrorSeverity`]**: the four-level severity scale used for logging
//!    levels and alerting.
//! 4. **[`AppError`]**: a structured application error carrying an error
//!    code, a user-facing message and a context map, with constructors for
//!    each external service the assistants talk to.
//! 5. **[`ErrorHandler`]** (with `observability`): converts foreign errors
//!    into `AppError` and logs them at a severity-derived level.
//!
//! ## Implementing ErrorClassification
//!
//! ```rust
//! # #[cfg(feature = "foundation")]
//! # {
//! use assistkit_common::error::{ErrorClassification, ErrorKind, ErrorSeverity};
//!
//! #[derive(Debug)]
//! enum NotionFailure {
//!     Unreachable,
//!     BadQuery(String),
//! }
//!
//! impl ErrorClassification for NotionFailure {
//!     fn error_kind(&self) -> ErrorKind {
//!         match self {
//!             Self::Unreachable => ErrorKind::Connection,
//!             Self::BadQuery(_) => ErrorKind::Validation,
//!         }
//!     }
//!
//!     fn severity(&self) -> ErrorSeverity {
//!         match self {
//!             Self::Unreachable => ErrorSeverity::High,
//!             Self::BadQuery(_) => ErrorSeverity::Low,
//!         }
//!     }
//! }
//!
//! assert!(NotionFailure::Unreachable.error_kind().is_transient());
//! assert!(!NotionFailure::BadQuery("x".into()).is_critical());
//! # }
//! ```

mod app;
#[cfg(feature = "observability")]
mod handler;

use std::fmt;
use std::io;
use std::time::Duration;

pub use app::{AppError, DEFAULT_USER_MESSAGE};
#[cfg(feature = "observability")]
pub use handler::ErrorHandler;
use serde::{Deserialize, Serialize};

/// Coarse category of a failure, used as the input of retry classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Could not reach the dependency (refused, reset, DNS, ...)
    Connection,
    /// The dependency did not answer in time
    Timeout,
    /// The request itself was malformed
    Validation,
    /// A value had the wrong type or shape
    InvalidType,
    /// The dependency throttled the caller
    RateLimited,
    /// The dependency answered with a failure
    Backend,
    /// A circuit breaker rejected the call without attempting it
    CircuitOpen,
    /// Misconfiguration detected at runtime
    Configuration,
    /// Access was denied
    Security,
    /// Invariant violation inside this process
    Internal,
    /// Anything not otherwise categorised
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Connection,
        Self::Timeout,
        Self::Validation,
        Self::InvalidType,
        Self::RateLimited,
        Self::Backend,
        Self::CircuitOpen,
        Self::Configuration,
        Self::Security,
        Self::Internal,
        Self::Unknown,
    ];

    /// Kinds that usually clear up on their own.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Connection | Self::Timeout | Self::RateLimited)
    }

    /// Stable snake_case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::InvalidType => "invalid_type",
            Self::RateLimited => "rate_limited",
            Self::Backend => "backend",
            Self::CircuitOpen => "circuit_open",
            Self::Configuration => "configuration",
            Self::Security => "security",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error classification trait for consistent retry and logging decisions
///
/// Only [`error_kind`](Self::error_kind) and [`severity`](Self::severity)
/// are required; the rest have conservative defaults.
pub trait ErrorClassification {
    /// Category of the failure.
    fn error_kind(&self) -> ErrorKind;

    /// Severity used to pick a log level.
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error declares itself safe to retry.
    ///
    /// Consulted by the retry engine when the error's kind is not
    /// explicitly whitelisted.
    fn retry_possible(&self) -> bool {
        false
    }

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested delay before retrying, if the dependency gave one
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Expected or user-caused, informational
    Low,
    /// Degraded behaviour, should be monitored
    Medium,
    /// Failure of a dependency, requires attention
    High,
    /// System integrity or security at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for io::Error {
    fn error_kind(&self) -> ErrorKind {
        match self.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::AddrNotAvailable => ErrorKind::Connection,
            io::ErrorKind::InvalidInput => ErrorKind::Validation,
            io::ErrorKind::InvalidData => ErrorKind::InvalidType,
            io::ErrorKind::PermissionDenied => ErrorKind::Security,
            _ => ErrorKind::Unknown,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self.error_kind() {
            ErrorKind::Validation | ErrorKind::InvalidType => ErrorSeverity::Low,
            ErrorKind::Security => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }
}
