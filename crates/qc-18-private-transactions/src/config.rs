//! # Configuration
//!
//! Payload-exchange connection and cache settings. Loaded from a config file
//! section (serde, every field optional) or from `QC_PTM_*` environment
//! variables.

use crate::errors::ConfigError;
use quantum_telemetry::parse_flag;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Private transaction configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PrivateTxConfig {
    /// Payload-exchange service.
    pub exchange: ExchangeConfig,
    /// Payload cache.
    pub cache: CacheConfig,
}

/// Payload-exchange service connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Run with a payload exchange. When false the node cannot see any
    /// private payload.
    pub enabled: bool,
    /// Base URL of the service.
    pub url: String,
    /// Whole-request timeout.
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,
    /// TCP connect timeout.
    #[serde(with = "duration_str")]
    pub connect_timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://127.0.0.1:9101".to_string(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Payload cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry time-to-live.
    #[serde(with = "duration_str")]
    pub ttl: Duration,
    /// Background sweep period.
    #[serde(with = "duration_str")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl PrivateTxConfig {
    /// Defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_PTM_ENABLED`: Enable the payload exchange (default: false)
    /// - `QC_PTM_URL`: Exchange base URL (default: http://127.0.0.1:9101)
    /// - `QC_PTM_TIMEOUT_MS`: Request timeout in milliseconds (default: 10000)
    /// - `QC_PTM_CACHE_TTL_SECS`: Cache TTL in seconds (default: 300)
    /// - `QC_PTM_SWEEP_SECS`: Cache sweep period in seconds (default: 300)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let read_u64 = |name: &'static str| -> Result<Option<u64>, ConfigError> {
            read(name)
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidEnv { name, value })
                })
                .transpose()
        };
        let mut config = Self::default();

        if let Some(value) = read("QC_PTM_ENABLED") {
            config.exchange.enabled = parse_flag(&value).ok_or(ConfigError::InvalidEnv {
                name: "QC_PTM_ENABLED",
                value,
            })?;
        }
        if let Some(url) = read("QC_PTM_URL") {
            config.exchange.url = url;
        }
        if let Some(ms) = read_u64("QC_PTM_TIMEOUT_MS")? {
            config.exchange.request_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = read_u64("QC_PTM_CACHE_TTL_SECS")? {
            config.cache.ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = read_u64("QC_PTM_SWEEP_SECS")? {
            config.cache.sweep_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exchange.enabled {
            let url = self.exchange.url.trim();
            if url.is_empty() {
                return Err(invalid("exchange.url", "cannot be empty"));
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid("exchange.url", "must be an http(s) URL"));
            }
        }

        if self.exchange.request_timeout.is_zero() {
            return Err(invalid("exchange.request_timeout", "cannot be 0"));
        }
        if self.exchange.connect_timeout.is_zero() {
            return Err(invalid("exchange.connect_timeout", "cannot be 0"));
        }
        if self.cache.ttl.is_zero() {
            return Err(invalid("cache.ttl", "cannot be 0"));
        }
        if self.cache.sweep_interval.is_zero() {
            return Err(invalid("cache.sweep_interval", "cannot be 0"));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

/// Durations as `"300s"`, `"1500ms"`, `"5m"`, `"1h"` or plain seconds.
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let (digits, unit_ms) = if let Some(ms) = s.strip_suffix("ms") {
            (ms, 1)
        } else if let Some(secs) = s.strip_suffix('s') {
            (secs, 1_000)
        } else if let Some(mins) = s.strip_suffix('m') {
            (mins, 60_000)
        } else if let Some(hours) = s.strip_suffix('h') {
            (hours, 3_600_000)
        } else {
            (s, 1_000)
        };

        digits
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(unit_ms))
            .map(Duration::from_millis)
            .ok_or_else(|| format!("invalid duration {s:?}"))
    }
}
