//! # Quantum Telemetry
//!
//! Logging and metrics for Quantum-Chain private transaction execution.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter` and a plain or
//!   JSON formatter
//! - **Metrics**: Prometheus counters, gauges and histograms in a global
//!   registry, exported in text format
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quantum_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::for_subsystem("18", "private-transactions");
//!     init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `QC_JSON_LOGS` | `false` | JSON log lines |
//! | `QC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `QC_SUBSYSTEM_ID` | `00` | Subsystem identifier |
//! | `QC_SERVICE_NAME` | `quantum-chain` | Service name on log lines |

#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{parse_flag, TelemetryConfig};
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, EXCHANGE_REQUESTS, EXCHANGE_REQUEST_DURATION,
    PAYLOAD_CACHE_ENTRIES, PAYLOAD_CACHE_EVICTIONS, PAYLOAD_CACHE_HITS, PAYLOAD_CACHE_MISSES,
    PAYLOAD_SIZE_BYTES, PRIVACY_FLAG_FAILURES, PRIVATE_MESSAGES_APPLIED, STATE_EXTENSIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or metrics conflict.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}
