//! Health check data types

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verdict of a single probe or of the whole process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one probe run
///
/// Probes fill in `name`, `status` and `message`; the monitor stamps
/// `response_time_ms` and `last_checked` after each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl HealthCheck {
    pub fn new(name: impl Into<String>, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            response_time_ms: None,
            last_checked: None,
            details: BTreeMap::new(),
        }
    }

    pub fn healthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Healthy, message)
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Degraded, message)
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Unhealthy, message)
    }

    #[must_use]
    pub fn with_response_time(mut self, response_time_ms: f64) -> Self {
        self.response_time_ms = Some(response_time_ms);
        self
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Listener for overall health changes
///
/// Called once per monitoring round in which the overall status differs from
/// the previous round's, including the first round.
#[async_trait]
pub trait HealthStatusListener: Send + Sync {
    async fn on_health_changed(&self, overall: HealthCheck);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(HealthStatus::Degraded).unwrap(), "degraded");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let check = HealthCheck::healthy("database", "Database connection successful");
        let json = serde_json::to_value(&check).unwrap();

        assert_eq!(json["status"], "healthy");
        assert!(json.get("response_time_ms").is_none());
        assert!(json.get("details").is_none());

        let restored: HealthCheck = serde_json::from_value(json).unwrap();
        assert_eq!(restored, check);
    }

    #[test]
    fn test_builders() {
        let check = HealthCheck::degraded("slack_api", "slow")
            .with_response_time(6200.0)
            .with_detail("threshold_ms", 5000);
        assert!(!check.is_healthy());
        assert_eq!(check.response_time_ms, Some(6200.0));
        assert_eq!(check.details["threshold_ms"], 5000);
    }
}
