//! Queue configuration, fixed for the lifetime of a `RequestQueue`.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_MAX_CONCURRENCY: &str = "TURNSTILE_MAX_CONCURRENCY";
pub const ENV_QUEUE_TIMEOUT_MS: &str = "TURNSTILE_QUEUE_TIMEOUT_MS";
pub const ENV_QUEUE_NAME: &str = "TURNSTILE_QUEUE_NAME";

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Label used in logs and snapshots
    #[serde(default = "default_name")]
    pub name: String,

    /// Max operations holding a slot at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Wait timeout applied when a submission doesn't set its own.
    /// `None` waits indefinitely.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: Option<u64>,
}

fn default_name() -> String {
    "db".to_string()
}

fn default_max_concurrency() -> usize {
    10
}

fn default_timeout_ms() -> Option<u64> {
    Some(30_000)
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_concurrency: default_max_concurrency(),
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

impl QueueConfig {
    pub fn new(max_concurrency: usize, default_timeout: Option<Duration>) -> Self {
        Self {
            max_concurrency,
            default_timeout_ms: default_timeout.map(|d| d.as_millis() as u64),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.default_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Build from `TURNSTILE_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading through `lookup`.
    ///
    /// `TURNSTILE_QUEUE_TIMEOUT_MS` accepts `0` or `none` to disable the
    /// default timeout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_QUEUE_NAME) {
            config.name = name;
        }

        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            config.max_concurrency = raw.trim().parse().map_err(|_| ConfigError::Env {
                key: ENV_MAX_CONCURRENCY,
                value: raw.clone(),
            })?;
        }

        if let Some(raw) = lookup(ENV_QUEUE_TIMEOUT_MS) {
            let trimmed = raw.trim();
            config.default_timeout_ms = if trimmed.eq_ignore_ascii_case("none") {
                None
            } else {
                match trimmed.parse::<u64>() {
                    Ok(0) => None,
                    Ok(ms) => Some(ms),
                    Err(_) => {
                        return Err(ConfigError::Env {
                            key: ENV_QUEUE_TIMEOUT_MS,
                            value: raw.clone(),
                        });
                    }
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.name, "db");
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.default_timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: QueueConfig = serde_json::from_str(r#"{"max_concurrency": 3}"#).unwrap();
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.default_timeout_ms, Some(30_000));
        assert_eq!(config.name, "db");
    }

    #[test]
    fn explicit_null_disables_default_timeout() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"default_timeout_ms": null}"#).unwrap();
        assert_eq!(config.default_timeout(), None);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = QueueConfig::new(0, None);
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = QueueConfig::new(1, Some(Duration::ZERO));
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = QueueConfig::from_lookup(lookup(&[
            (ENV_MAX_CONCURRENCY, "4"),
            (ENV_QUEUE_TIMEOUT_MS, "250"),
            (ENV_QUEUE_NAME, "postgres"),
        ]))
        .unwrap();

        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.name, "postgres");
    }

    #[rstest]
    #[case::zero("0")]
    #[case::none("none")]
    #[case::none_upper("NONE")]
    fn env_can_disable_timeout(#[case] raw: &str) {
        let config = QueueConfig::from_lookup(lookup(&[(ENV_QUEUE_TIMEOUT_MS, raw)])).unwrap();
        assert_eq!(config.default_timeout(), None);
    }

    #[rstest]
    #[case::not_a_number(ENV_MAX_CONCURRENCY, "many")]
    #[case::negative(ENV_MAX_CONCURRENCY, "-1")]
    #[case::bad_timeout(ENV_QUEUE_TIMEOUT_MS, "soon")]
    fn env_rejects_garbage(#[case] key: &'static str, #[case] raw: &str) {
        let err = QueueConfig::from_lookup(lookup(&[(key, raw)])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Env {
                key,
                value: raw.to_string()
            }
        );
    }

    #[test]
    fn env_zero_concurrency_fails_validation() {
        let err = QueueConfig::from_lookup(lookup(&[(ENV_MAX_CONCURRENCY, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroConcurrency);
    }
}
