//! Prometheus metrics for the event intake pipeline.
//!
//! All metrics follow the naming convention: `qc_intake_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., duplicates_total)
//! - **Gauge**: Value that can go up or down (e.g., orphan_buffer_size)

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // STAGE METRICS
    // =========================================================================

    /// Events dropped by the deduplicator as exact duplicates
    pub static ref DUPLICATE_EVENTS: Counter = Counter::new(
        "qc_intake_duplicate_events_total",
        "Events dropped because an identical event was already seen"
    ).expect("metric creation failed");

    /// Events sharing a descriptor with a known event but carrying a different signature
    pub static ref DISPARATE_SIGNATURES: Counter = Counter::new(
        "qc_intake_disparate_signatures_total",
        "Events with a known descriptor but a different signature"
    ).expect("metric creation failed");

    /// Events dropped, by stage and reason
    pub static ref DROPPED_EVENTS: CounterVec = CounterVec::new(
        Opts::new("qc_intake_dropped_events_total", "Events dropped by an intake stage"),
        &["stage", "reason"]
    ).expect("metric creation failed");

    /// Events currently waiting in the orphan buffer
    pub static ref ORPHAN_BUFFER_SIZE: Gauge = Gauge::new(
        "qc_intake_orphan_buffer_size",
        "Events waiting in the orphan buffer for missing parents"
    ).expect("metric creation failed");

    /// Events released to consensus in topological order
    pub static ref RELEASED_EVENTS: Counter = Counter::new(
        "qc_intake_released_events_total",
        "Events released by the orphan buffer"
    ).expect("metric creation failed");

    // =========================================================================
    // SCHEDULER METRICS
    // =========================================================================

    /// Unprocessed tasks per scheduler, sampled on each heartbeat
    pub static ref UNPROCESSED_TASKS: GaugeVec = GaugeVec::new(
        Opts::new("qc_intake_unprocessed_tasks", "Tasks queued or running per scheduler"),
        &["scheduler"]
    ).expect("metric creation failed");

    /// Completed pipeline flushes
    pub static ref PIPELINE_FLUSHES: Counter = Counter::new(
        "qc_intake_flushes_total",
        "Completed intake pipeline flushes"
    ).expect("metric creation failed");

    /// Completed pipeline clears
    pub static ref PIPELINE_CLEARS: Counter = Counter::new(
        "qc_intake_clears_total",
        "Completed intake pipeline clears"
    ).expect("metric creation failed");
}

/// Handle proving the intake metrics are registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

/// Register all intake metrics with the global registry.
///
/// Registering twice is not an error.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(DUPLICATE_EVENTS.clone()),
        Box::new(DISPARATE_SIGNATURES.clone()),
        Box::new(DROPPED_EVENTS.clone()),
        Box::new(ORPHAN_BUFFER_SIZE.clone()),
        Box::new(RELEASED_EVENTS.clone()),
        Box::new(UNPROCESSED_TASKS.clone()),
        Box::new(PIPELINE_FLUSHES.clone()),
        Box::new(PIPELINE_CLEARS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
