//! Structured application error
//!
//! `AppError` is what the assistants surface to their own handlers: a
//! machine-readable code, a severity, a free-form context map and a message
//! that is safe to show to the end user. The per-service constructors fix
//! the code, severity, user message and retriability for each dependency.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{ErrorClassification, ErrorKind, ErrorSeverity};

/// User message used when a constructor does not provide one.
pub const DEFAULT_USER_MESSAGE: &str = "An error occurred. Please try again.";

const GENERIC_ERROR_CODE: &str = "APP_ERROR";

/// Application error with structured information
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    message: String,
    error_code: String,
    kind: ErrorKind,
    severity: ErrorSeverity,
    context: BTreeMap<String, Value>,
    user_message: String,
    retry_possible: bool,
}

impl AppError {
    /// Generic error: medium severity, unknown kind, not retriable.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_code: GENERIC_ERROR_CODE.to_string(),
            kind: ErrorKind::Unknown,
            severity: ErrorSeverity::Medium,
            context: BTreeMap::new(),
            user_message: DEFAULT_USER_MESSAGE.to_string(),
            retry_possible: false,
        }
    }

    /// Slack API failure; `api_error` is stored as `context.slack_error`.
    pub fn slack_api(message: impl Into<String>, api_error: Option<&str>) -> Self {
        Self::service(
            message,
            "SLACK_API_ERROR",
            "Unable to communicate with Slack. Please try again.",
        )
        .with_optional_context("slack_error", api_error)
    }

    /// Notion API failure; `notion_error` is stored as `context.notion_error`.
    pub fn notion_api(message: impl Into<String>, notion_error: Option<&str>) -> Self {
        Self::service(
            message,
            "NOTION_API_ERROR",
            "Unable to access Notion. Please check your connection.",
        )
        .with_optional_context("notion_error", notion_error)
    }

    /// OpenAI API failure; `openai_error` is stored as `context.openai_error`.
    pub fn openai_api(message: impl Into<String>, openai_error: Option<&str>) -> Self {
        Self::service(
            message,
            "OPENAI_API_ERROR",
            "AI service temporarily unavailable. Please try again.",
        )
        .with_optional_context("openai_error", openai_error)
    }

    /// Composio API failure; stored as `context.composio_error`.
    pub fn composio_api(message: impl Into<String>, composio_error: Option<&str>) -> Self {
        Self::service(
            message,
            "COMPOSIO_API_ERROR",
            "Integration service unavailable. Please try again.",
        )
        .with_optional_context("composio_error", composio_error)
    }

    /// Misconfiguration; critical and never retried.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(message)
            .with_code("CONFIG_ERROR")
            .with_kind(ErrorKind::Configuration)
            .with_severity(ErrorSeverity::Critical)
            .with_user_message("Service configuration error. Please contact support.")
    }

    /// Access denied; critical and never retried.
    pub fn security(message: impl Into<String>) -> Self {
        Self::new(message)
            .with_code("SECURITY_ERROR")
            .with_kind(ErrorKind::Security)
            .with_severity(ErrorSeverity::Critical)
            .with_user_message("Access denied.")
    }

    /// Throttled by a dependency; retriable, `retry_after` kept in context.
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let mut error = Self::new(message)
            .with_code("RATE_LIMIT_ERROR")
            .with_kind(ErrorKind::RateLimited)
            .with_severity(ErrorSeverity::Medium)
            .with_user_message("Too many requests. Please wait a moment and try again.")
            .retriable(true);
        if let Some(delay) = retry_after {
            error = error.with_context("retry_after", delay.as_secs());
        }
        error
    }

    /// Invalid input; low severity and never retried.
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::new(message)
            .with_code("VALIDATION_ERROR")
            .with_kind(ErrorKind::Validation)
            .with_severity(ErrorSeverity::Low)
            .with_user_message("Invalid input. Please check your request and try again.")
            .with_optional_context("field", field)
    }

    /// Network-level failure; retriable.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(message)
            .with_code("CONNECTION_ERROR")
            .with_kind(ErrorKind::Connection)
            .with_severity(ErrorSeverity::High)
            .with_user_message("Connection error. Please try again.")
            .retriable(true)
    }

    fn service(message: impl Into<String>, code: &str, user_message: &str) -> Self {
        Self::new(message)
            .with_code(code)
            .with_kind(ErrorKind::Backend)
            .with_severity(ErrorSeverity::High)
            .with_user_message(user_message)
            .retriable(true)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = code.into();
        self
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = user_message.into();
        self
    }

    /// Attach a context entry. Values that fail to serialize are stored as
    /// `null`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.context.insert(key.into(), value);
        self
    }

    pub fn retriable(mut self, retry_possible: bool) -> Self {
        self.retry_possible = retry_possible;
        self
    }

    fn with_optional_context(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_context(key, value),
            None => self,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    /// Flat JSON record for structured logging.
    pub fn to_record(&self) -> Value {
        serde_json::json!({
            "error_code": self.error_code,
            "message": self.message,
            "kind": self.kind,
            "severity": self.severity,
            "context": self.context,
            "user_message": self.user_message,
            "retry_possible": self.retry_possible,
        })
    }
}

impl ErrorClassification for AppError {
    fn error_kind(&self) -> ErrorKind {
        self.kind
    }

    fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    fn retry_possible(&self) -> bool {
        self.retry_possible
    }

    fn retry_after(&self) -> Option<Duration> {
        self.context.get("retry_after").and_then(Value::as_u64).map(Duration::from_secs)
    }
}
