//! # Health Monitor
//!
//! Driven by a heartbeat. On every beat it samples each scheduler's
//! unprocessed count into the metrics sink and warns once per excursion
//! above the threshold.

use std::collections::HashSet;
use std::sync::Arc;

use shared_wiring::SchedulerHandle;
use tracing::{info, warn};

use crate::ports::outbound::IntakeMetrics;

/// Samples scheduler backlogs.
pub struct HealthMonitor {
    schedulers: Vec<SchedulerHandle>,
    metrics: Arc<dyn IntakeMetrics>,
    threshold: usize,
    over_threshold: HashSet<String>,
}

impl HealthMonitor {
    pub fn new(
        schedulers: Vec<SchedulerHandle>,
        metrics: Arc<dyn IntakeMetrics>,
        threshold: usize,
    ) -> Self {
        Self {
            schedulers,
            metrics,
            threshold,
            over_threshold: HashSet::new(),
        }
    }

    /// Take one sample of every scheduler.
    pub fn check(&mut self) {
        for scheduler in &self.schedulers {
            let name = scheduler.name();
            let count = scheduler.unprocessed_count();
            self.metrics.record_unprocessed(name, count);

            if count > self.threshold {
                if self.over_threshold.insert(name.to_string()) {
                    warn!(scheduler = %name, unprocessed = count, threshold = self.threshold, "Scheduler backlog above threshold");
                }
            } else if self.over_threshold.remove(name) {
                info!(scheduler = %name, unprocessed = count, "Scheduler backlog recovered");
            }
        }
    }

    /// Schedulers currently above the threshold.
    #[must_use]
    pub fn unhealthy(&self) -> Vec<String> {
        let mut names: Vec<String> = self.over_threshold.iter().cloned().collect();
        names.sort();
        names
    }
}
