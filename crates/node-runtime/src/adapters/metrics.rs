//! `IntakeMetrics` backed by the `qc_intake_*` Prometheus collectors.

use qc_event_intake::{IntakeMetrics, IntakeStage};
use quantum_telemetry::{
    DISPARATE_SIGNATURES, DROPPED_EVENTS, DUPLICATE_EVENTS, ORPHAN_BUFFER_SIZE, PIPELINE_CLEARS,
    PIPELINE_FLUSHES, UNPROCESSED_TASKS,
};

/// Prometheus metrics sink. Stateless; the collectors are global.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusIntakeMetrics;

impl IntakeMetrics for PrometheusIntakeMetrics {
    fn record_duplicate(&self) {
        DUPLICATE_EVENTS.inc();
    }

    fn record_disparate_signature(&self) {
        DISPARATE_SIGNATURES.inc();
    }

    fn record_dropped(&self, stage: IntakeStage, reason: &'static str) {
        DROPPED_EVENTS
            .with_label_values(&[stage.as_str(), reason])
            .inc();
    }

    fn set_orphan_buffer_size(&self, size: usize) {
        ORPHAN_BUFFER_SIZE.set(size as f64);
    }

    fn record_unprocessed(&self, scheduler: &str, count: usize) {
        UNPROCESSED_TASKS
            .with_label_values(&[scheduler])
            .set(count as f64);
    }

    fn record_flush_completed(&self) {
        PIPELINE_FLUSHES.inc();
    }

    fn record_clear_completed(&self) {
        PIPELINE_CLEARS.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_uses_stage_label() {
        let metrics = PrometheusIntakeMetrics;
        let before = DROPPED_EVENTS
            .with_label_values(&["internal_event_validator", "generation"])
            .get();
        metrics.record_dropped(IntakeStage::InternalValidator, "generation");
        let after = DROPPED_EVENTS
            .with_label_values(&["internal_event_validator", "generation"])
            .get();
        assert!(after >= before + 1.0);
    }

    #[test]
    fn test_unprocessed_gauge() {
        PrometheusIntakeMetrics.record_unprocessed("metrics_test_scheduler", 7);
        assert_eq!(
            UNPROCESSED_TASKS
                .with_label_values(&["metrics_test_scheduler"])
                .get(),
            7.0
        );
    }
}
