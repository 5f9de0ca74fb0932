//! Tracing subscriber initialisation
//!
//! `RUST_LOG` takes precedence over the configured level. The returned span
//! carries `app_name`, `version` and `environment`; enter it (or instrument
//! the top-level future with it) so every record inherits those fields.

use assistkit_domain::{AssistError, LoggingConfig, Result};
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber described by `config`.
///
/// # Errors
/// Returns `AssistError::Config` for an unparsable level and
/// `AssistError::Internal` if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<Span> {
    let filter = env_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_current_span(true).with_span_list(false)).try_init()
    } else {
        registry.with(fmt::layer().pretty()).try_init()
    };
    installed.map_err(|e| AssistError::Internal(format!("Logging already initialised: {e}")))?;

    let span = context_span(config);
    tracing::info!(
        level = %config.level,
        json = config.json,
        "Logging initialised"
    );
    Ok(span)
}

/// Root span carrying the process identity fields
pub fn context_span(config: &LoggingConfig) -> Span {
    tracing::info_span!(
        "assistkit",
        app_name = %config.app_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
    )
}

fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_ascii_lowercase()))
        .map_err(|e| AssistError::Config(format!("Invalid log level '{level}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_returns_error() {
        let config = LoggingConfig { json: true, ..LoggingConfig::default() };

        assert!(init(&config).is_ok());

        let err = init(&config).unwrap_err();
        assert!(matches!(err, AssistError::Internal(_)));
    }
}
