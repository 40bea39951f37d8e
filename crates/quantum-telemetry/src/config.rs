//! Logging settings, from a config file section or `QC_*` variables.

use serde::{Deserialize, Serialize};
use std::env;

/// How the subsystem writes its logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Subsystem identifier, `00` when the process hosts several
    pub subsystem_id: String,

    /// Level (`info`, `debug`, ...) or a full `EnvFilter` directive
    pub log_level: String,

    /// Write log lines to stdout
    pub console_output: bool,

    /// One JSON object per line instead of the human-readable format
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "quantum-chain".to_string(),
            subsystem_id: "00".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by environment variables.
    ///
    /// - `QC_SERVICE_NAME`, `QC_SUBSYSTEM_ID`
    /// - `QC_LOG_LEVEL`, falling back to `RUST_LOG`
    /// - `QC_CONSOLE_OUTPUT`, `QC_JSON_LOGS`: boolean flags, see [`parse_flag`]
    ///
    /// JSON logs default to on inside a container (`KUBERNETES_SERVICE_HOST`
    /// or `DOCKER_CONTAINER` set). Unparsable flags keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str, default: bool| {
            lookup(name)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(default)
        };
        let in_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();
        let defaults = Self::default();

        Self {
            service_name: lookup("QC_SERVICE_NAME").unwrap_or(defaults.service_name),
            subsystem_id: lookup("QC_SUBSYSTEM_ID").unwrap_or(defaults.subsystem_id),
            log_level: lookup("QC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: flag("QC_CONSOLE_OUTPUT", defaults.console_output),
            json_logs: flag("QC_JSON_LOGS", in_container),
        }
    }

    /// Environment configuration named after one subsystem, e.g.
    /// `qc-18-private-transactions`.
    #[must_use]
    pub fn for_subsystem(subsystem_id: &str, subsystem_name: &str) -> Self {
        Self {
            subsystem_id: subsystem_id.to_string(),
            service_name: format!("qc-{subsystem_id}-{subsystem_name}"),
            ..Self::from_env()
        }
    }

    /// Service name with the subsystem id appended, unless it is `00`.
    #[must_use]
    pub fn full_service_name(&self) -> String {
        if self.subsystem_id == "00" {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.subsystem_id)
        }
    }
}

/// Boolean setting: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any
/// case, surrounding whitespace ignored.
#[must_use]
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
