//! Prometheus metrics for private transaction execution.
//!
//! All metrics follow the naming convention: `qc_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., payload_cache_hits_total)
//! - **Gauge**: Value that can go up or down (e.g., payload_cache_entries)
//! - **Histogram**: Distribution of values (e.g., exchange_request_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // MESSAGE APPLICATION
    // =========================================================================

    /// Messages applied by the private state transition
    pub static ref PRIVATE_MESSAGES_APPLIED: CounterVec = CounterVec::new(
        Opts::new("qc_private_messages_applied_total", "Messages applied by the private state transition"),
        &["outcome"]  // public, success, reverted, failed, not_participant
    ).expect("metric creation failed");

    /// Transactions marked failed by privacy flag checks
    pub static ref PRIVACY_FLAG_FAILURES: CounterVec = CounterVec::new(
        Opts::new("qc_private_flag_failures_total", "Private transactions failed by privacy flag checks"),
        &["reason"]  // not_attested, missing_merkle_root, legacy_contract, flag_mismatch, ...
    ).expect("metric creation failed");

    // =========================================================================
    // PAYLOAD CACHE
    // =========================================================================

    /// Cache hits in the caching exchange manager
    pub static ref PAYLOAD_CACHE_HITS: Counter = Counter::new(
        "qc_private_payload_cache_hits_total",
        "Payload lookups served from cache"
    ).expect("metric creation failed");

    /// Cache misses in the caching exchange manager
    pub static ref PAYLOAD_CACHE_MISSES: Counter = Counter::new(
        "qc_private_payload_cache_misses_total",
        "Payload lookups forwarded to the exchange"
    ).expect("metric creation failed");

    /// Entries removed by TTL expiry
    pub static ref PAYLOAD_CACHE_EVICTIONS: Counter = Counter::new(
        "qc_private_payload_cache_evictions_total",
        "Payload cache entries removed after expiry"
    ).expect("metric creation failed");

    /// Current cache size
    pub static ref PAYLOAD_CACHE_ENTRIES: Gauge = Gauge::new(
        "qc_private_payload_cache_entries",
        "Payload cache entries currently held"
    ).expect("metric creation failed");

    /// Sizes of payloads entering the cache
    pub static ref PAYLOAD_SIZE_BYTES: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "qc_private_payload_size_bytes",
            "Size of private payloads sent or fetched"
        ).buckets(exponential_buckets(64.0, 4.0, 10).expect("valid buckets")),
        &["direction"]  // sent, received
    ).expect("metric creation failed");

    // =========================================================================
    // PAYLOAD EXCHANGE
    // =========================================================================

    /// Requests to the payload-exchange service
    pub static ref EXCHANGE_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("qc_private_exchange_requests_total", "Requests to the payload-exchange service"),
        &["operation", "outcome"]  // operation: send/receive/is_sender, outcome: ok/not_found/error
    ).expect("metric creation failed");

    /// Exchange round-trip duration
    pub static ref EXCHANGE_REQUEST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "qc_private_exchange_request_duration_seconds",
            "Round-trip time to the payload-exchange service"
        ).buckets(exponential_buckets(0.001, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // STATE EXTENSION
    // =========================================================================

    /// State extension hook outcomes
    pub static ref STATE_EXTENSIONS: CounterVec = CounterVec::new(
        Opts::new("qc_private_state_extensions_total", "State extension hook outcomes"),
        &["outcome"]  // applied, ignored, reverted
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics already registered are skipped.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a metric conflicts with another
/// collector in the registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Message application
        Box::new(PRIVATE_MESSAGES_APPLIED.clone()),
        Box::new(PRIVACY_FLAG_FAILURES.clone()),
        // Cache
        Box::new(PAYLOAD_CACHE_HITS.clone()),
        Box::new(PAYLOAD_CACHE_MISSES.clone()),
        Box::new(PAYLOAD_CACHE_EVICTIONS.clone()),
        Box::new(PAYLOAD_CACHE_ENTRIES.clone()),
        Box::new(PAYLOAD_SIZE_BYTES.clone()),
        // Exchange
        Box::new(EXCHANGE_REQUESTS.clone()),
        Box::new(EXCHANGE_REQUEST_DURATION.clone()),
        // Extension
        Box::new(STATE_EXTENSIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if encoding fails.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    #[must_use]
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
