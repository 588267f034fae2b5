//! Configuration schema definitions.
//!
//! This module defines the configuration structure for breakers and the
//! ambient logging/metrics setup. All types derive Serde traits for
//! deserialization from config files; durations are written as `*_secs`.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Breaker settings. Used as the template when driving a registry.
    pub breaker: BreakerConfig,
}

/// Settings for a single circuit breaker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Breaker identifier for logging/metrics.
    pub name: String,

    /// Optional group tag (a registry sets this to its own name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Minimum time spent Open before a probe is allowed.
    #[serde(rename = "recovery_timeout_secs", with = "duration_secs")]
    pub recovery_timeout: Duration,

    /// Failures within the rolling window needed to trip.
    /// Negative values in a config file clamp to 0.
    #[serde(deserialize_with = "clamped_max_failures")]
    pub max_failures: usize,

    /// Span within which `max_failures` failures must fall to trip.
    #[serde(rename = "rolling_window_secs", with = "duration_secs")]
    pub rolling_window: Duration,
}

impl BreakerConfig {
    /// Create a config. Negative `max_failures` clamps to 0.
    pub fn new(
        name: impl Into<String>,
        recovery_timeout: Duration,
        max_failures: i64,
        rolling_window: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            group: None,
            recovery_timeout,
            max_failures: clamp_failures(max_failures),
            rolling_window,
        }
    }

    /// Set the group tag.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            group: None,
            recovery_timeout: Duration::from_secs(30),
            max_failures: 5,
            rolling_window: Duration::from_secs(15),
        }
    }
}

fn clamp_failures(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

fn clamped_max_failures<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_failures)
}

mod duration_secs {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BreakerConfig::default();
        assert_eq!(config.max_failures, 5);
        assert_eq!(config.rolling_window, Duration::from_secs(15));
        assert_eq!(config.recovery_timeout, Duration::from_secs(30));
        assert!(config.group.is_none());
    }

    #[test]
    fn test_negative_max_failures_clamps() {
        let config = BreakerConfig::new("db", Duration::from_secs(1), -3, Duration::from_secs(1));
        assert_eq!(config.max_failures, 0);
    }

    #[test]
    fn test_parse_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"

            [breaker]
            name = "payments"
            group = "upstreams"
            recovery_timeout_secs = 2.5
            max_failures = -1
            rolling_window_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.breaker.name, "payments");
        assert_eq!(config.breaker.group.as_deref(), Some("upstreams"));
        assert_eq!(config.breaker.recovery_timeout, Duration::from_millis(2500));
        assert_eq!(config.breaker.max_failures, 0);
        assert_eq!(config.breaker.rolling_window, Duration::from_secs(10));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result: Result<GuardConfig, _> = toml::from_str(
            r#"
            [breaker]
            recovery_timeout_secs = -1.0
            "#,
        );
        assert!(result.is_err());
    }
}
