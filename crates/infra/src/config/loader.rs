//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `ASSISTKIT_LOG_LEVEL` is absent, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated with
//! [`AppConfig::validate`] before it is returned.
//!
//! ## Environment Variables
//! - `ASSISTKIT_LOG_LEVEL` (required): default log filter level
//! - `ASSISTKIT_LOG_JSON`: emit JSON log lines (true/false)
//! - `ASSISTKIT_ENVIRONMENT`: deployment environment name
//! - `ASSISTKIT_HEALTH_CHECK_INTERVAL`: seconds between health rounds
//! - `ASSISTKIT_HEALTH_PROBE_TIMEOUT_MS`: per-probe timeout
//! - `ASSISTKIT_METRICS_MAX_POINTS`: history capacity per metric name
//! - `ASSISTKIT_RETRY_MAX_ATTEMPTS`: attempts for the default retry policy
//!
//! Breakers are not configurable from the environment; the presets apply.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{json,toml}` and `./assistkit.{json,toml}`
//! 2. `../config.{json,toml}` and `../../config.{json,toml}`
//! 3. The same names relative to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use assistkit_domain::{AppConfig, AssistError, Result};

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `AssistError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Unset optional variables keep their defaults.
///
/// # Errors
/// Returns `AssistError::Config` if `ASSISTKIT_LOG_LEVEL` is missing, a
/// numeric variable does not parse, or the result fails validation.
pub fn load_from_env() -> Result<AppConfig> {
    let mut config = AppConfig::default();

    config.logging.level = env_var("ASSISTKIT_LOG_LEVEL")?;
    config.logging.json = env_bool("ASSISTKIT_LOG_JSON", config.logging.json);
    if let Ok(environment) = std::env::var("ASSISTKIT_ENVIRONMENT") {
        config.logging.environment = environment;
    }

    if let Some(secs) = env_parse("ASSISTKIT_HEALTH_CHECK_INTERVAL", "health check interval")? {
        config.monitoring.check_interval_secs = secs;
    }
    if let Some(ms) = env_parse("ASSISTKIT_HEALTH_PROBE_TIMEOUT_MS", "probe timeout")? {
        config.monitoring.probe_timeout_ms = ms;
    }
    if let Some(points) = env_parse("ASSISTKIT_METRICS_MAX_POINTS", "metrics max points")? {
        config.metrics.max_points_per_metric = points;
    }
    if let Some(attempts) = env_parse("ASSISTKIT_RETRY_MAX_ATTEMPTS", "retry max attempts")? {
        config.retry.max_attempts = attempts;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations via
/// [`probe_config_paths`]. The format is detected by extension.
///
/// # Errors
/// Returns `AssistError::Config` if the file is missing, unreadable,
/// malformed or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AssistError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AssistError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AssistError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, by file extension
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AssistError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AssistError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AssistError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_names(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_names(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_names(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("assistkit.json"),
        dir.join("assistkit.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| AssistError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional numeric environment variable
///
/// `Ok(None)` when unset; an error naming `what` when set but malformed.
fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AssistError::Config(format!("Invalid {what}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
