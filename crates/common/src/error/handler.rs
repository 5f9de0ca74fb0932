//! Centralised conversion and reporting of errors

use std::error::Error as StdError;
use std::io;

use tracing::{error, info, warn};

use super::{AppError, ErrorClassification, ErrorKind, ErrorSeverity};

/// Converts arbitrary errors into [`AppError`] and logs them
///
/// `component` is attached to every log record so the log pipeline can tell
/// which assistant produced the error.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    component: String,
}

impl ErrorHandler {
    pub fn new(component: impl Into<String>) -> Self {
        Self { component: component.into() }
    }

    /// Convert `error` and log it. Returns the converted error.
    pub fn handle(&self, error: &(dyn StdError + 'static)) -> AppError {
        let app_error = Self::convert(error);
        self.report(&app_error);
        app_error
    }

    /// Map a foreign error onto the application taxonomy.
    ///
    /// An `AppError` passes through unchanged. Otherwise a service name in
    /// the message selects that service's constructor, I/O errors map by
    /// kind, and everything else becomes a retriable `UNKNOWN_ERROR`.
    pub fn convert(error: &(dyn StdError + 'static)) -> AppError {
        if let Some(app_error) = error.downcast_ref::<AppError>() {
            return app_error.clone();
        }

        let message = error.to_string();
        let lowered = message.to_lowercase();

        if lowered.contains("slack") {
            return AppError::slack_api(message, None);
        }
        if lowered.contains("notion") {
            return AppError::notion_api(message, None);
        }
        if lowered.contains("openai") {
            return AppError::openai_api(message, None);
        }
        if lowered.contains("composio") {
            return AppError::composio_api(message, None);
        }

        if let Some(io_error) = error.downcast_ref::<io::Error>() {
            match io_error.error_kind() {
                ErrorKind::Connection | ErrorKind::Timeout => {
                    return AppError::connection(message).with_kind(io_error.error_kind());
                }
                ErrorKind::Validation | ErrorKind::InvalidType => {
                    return AppError::validation(message, None);
                }
                _ => {}
            }
        }

        AppError::new(message)
            .with_code("UNKNOWN_ERROR")
            .with_severity(ErrorSeverity::High)
            .with_user_message("An unexpected error occurred. Please try again.")
            .retriable(true)
    }

    /// Log `error` at the level its severity calls for.
    pub fn report(&self, error: &AppError) {
        let record = error.to_record();
        match error.severity() {
            ErrorSeverity::Critical => error!(
                component = %self.component,
                error_code = error.error_code(),
                severity = %error.severity(),
                record = %record,
                "Critical error: {}",
                error.message()
            ),
            ErrorSeverity::High => error!(
                component = %self.component,
                error_code = error.error_code(),
                severity = %error.severity(),
                record = %record,
                "High severity error: {}",
                error.message()
            ),
            ErrorSeverity::Medium => warn!(
                component = %self.component,
                error_code = error.error_code(),
                severity = %error.severity(),
                record = %record,
                "Medium severity error: {}",
                error.message()
            ),
            ErrorSeverity::Low => info!(
                component = %self.component,
                error_code = error.error_code(),
                severity = %error.severity(),
                record = %record,
                "Low severity error: {}",
                error.message()
            ),
        }
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new("assistkit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Plain(String);

    #[test]
    fn test_app_error_passes_through() {
        let original = AppError::security("token revoked");
        let converted = ErrorHandler::convert(&original);
        assert_eq!(converted, original);
    }

    /// Validates keyword-based service detection.
    ///
    /// Assertions:
    /// - Confirms a message mentioning Notion becomes `NOTION_API_ERROR`.
    /// - Confirms the match is case-insensitive.
    #[test]
    fn test_service_keyword_mapping() {
        let converted = ErrorHandler::convert(&Plain("Notion returned 502".into()));
        assert_eq!(converted.error_code(), "NOTION_API_ERROR");

        let converted = ErrorHandler::convert(&Plain("OpenAI quota exhausted".into()));
        assert_eq!(converted.error_code(), "OPENAI_API_ERROR");
    }

    #[test]
    fn test_io_errors_map_by_kind() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let converted = ErrorHandler::convert(&refused);
        assert_eq!(converted.error_code(), "CONNECTION_ERROR");
        assert!(converted.retry_possible());

        let invalid = io::Error::new(io::ErrorKind::InvalidInput, "bad channel id");
        let converted = ErrorHandler::convert(&invalid);
        assert_eq!(converted.error_code(), "VALIDATION_ERROR");
        assert!(!converted.retry_possible());
    }

    #[test]
    fn test_unknown_errors_are_retriable() {
        let converted = ErrorHandler::convert(&Plain("something odd".into()));
        assert_eq!(converted.error_code(), "UNKNOWN_ERROR");
        assert_eq!(converted.severity(), ErrorSeverity::High);
        assert!(converted.retry_possible());
    }

    #[test]
    fn test_handle_returns_converted_error() {
        let handler = ErrorHandler::new("notion-assistant");
        let converted = handler.handle(&Plain("composio webhook failed".into()));
        assert_eq!(converted.error_code(), "COMPOSIO_API_ERROR");
    }
}
