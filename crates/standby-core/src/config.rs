//! standby.toml configuration.
//!
//! The orchestrator takes a [`FailoverConfig`] by value; only the binary
//! reads it from disk.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::RetryPolicy;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// Deadline applied to every collaborator call.
    #[serde(default = "default_call_timeout")]
    pub call_timeout: String,
    pub primary: EndpointConfig,
    pub replica: EndpointConfig,
    pub routing: RoutingConfig,
    pub notify: NotifyConfig,
    #[serde(default)]
    pub promotion: PromotionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Database instance identifier.
    pub id: String,
    /// Address the routing record points at for this endpoint.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Name shared by the two weighted records.
    pub record_name: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionConfig {
    pub backup_retention_days: u32,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            backup_retention_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// First backoff, doubled on each later attempt.
    pub initial_backoff: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: "2s".to_string(),
        }
    }
}

fn default_ttl() -> u32 {
    60
}

fn default_call_timeout() -> String {
    "10s".to_string()
}

impl FailoverConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FailoverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("primary.id", &self.primary.id),
            ("primary.address", &self.primary.address),
            ("replica.id", &self.replica.id),
            ("replica.address", &self.replica.address),
            ("routing.record_name", &self.routing.record_name),
            ("notify.topic", &self.notify.topic),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        if self.primary.id == self.replica.id {
            return Err(ConfigError::Invalid(
                "primary and replica must be different endpoints".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        self.retry_policy()?;
        if self.call_timeout()?.is_zero() {
            return Err(ConfigError::Invalid(
                "call_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let initial_backoff = parse_duration(&self.retry.initial_backoff).ok_or_else(|| {
            ConfigError::Duration {
                field: "retry.initial_backoff",
                value: self.retry.initial_backoff.clone(),
            }
        })?;
        Ok(RetryPolicy::new(self.retry.max_attempts, initial_backoff))
    }

    pub fn call_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.call_timeout).ok_or_else(|| ConfigError::Duration {
            field: "call_timeout",
            value: self.call_timeout.clone(),
        })
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Scaffold a config for the given primary/replica pair.
    pub fn scaffold(primary_id: &str, replica_id: &str, record_name: &str) -> Self {
        FailoverConfig {
            call_timeout: default_call_timeout(),
            primary: EndpointConfig {
                id: primary_id.to_string(),
                address: format!("{primary_id}.db.internal"),
            },
            replica: EndpointConfig {
                id: replica_id.to_string(),
                address: format!("{replica_id}.db.internal"),
            },
            routing: RoutingConfig {
                record_name: record_name.to_string(),
                ttl: default_ttl(),
            },
            notify: NotifyConfig {
                topic: "db-failover".to_string(),
            },
            promotion: PromotionConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
