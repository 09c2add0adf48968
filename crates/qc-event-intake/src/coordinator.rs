//! # Intake Pipeline Coordinator
//!
//! Flushes and clears the stage chain. The orphan buffer's released events
//! flow back into the pipeline through gossip, so a reset must first break
//! that cycle:
//!
//! ```text
//! 1. pause orphan buffer input, flush it  (cycle broken, nothing in flight)
//! 2. flush every stage, hasher first      (in-flight events finish or drop)
//! 3. unpause orphan buffer input
//! 4. clear deduplicator and orphan buffer (no concurrent access possible)
//! ```
//!
//! Only the orphan buffer's event input is paused. Event window updates and
//! clear requests reach it throughout the reset.
//!
//! Coordination calls are serialized; two overlapping clears would
//! interleave squelch state.

use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::GossipEvent;
use shared_wiring::{InputWire, SchedulerHandle, WiringError};
use tracing::{debug, info, warn};

use crate::domain::intake_counter::IntakeEventCounter;
use crate::ports::outbound::IntakeMetrics;

/// Scheduler handles and clear inputs the coordinator drives.
pub struct CoordinatedSchedulers {
    /// Intake stages in pipeline order, orphan buffer last.
    pub stages: Vec<SchedulerHandle>,
    /// Consumers of released events.
    pub consumers: Vec<SchedulerHandle>,
    pub deduplicator: SchedulerHandle,
    pub orphan_buffer: SchedulerHandle,
    /// Event input of the orphan buffer, paused during a clear.
    pub orphan_buffer_events: InputWire<GossipEvent>,
    pub deduplicator_clear: InputWire<()>,
    pub orphan_buffer_clear: InputWire<()>,
}

/// Serialized flush/clear driver.
pub struct IntakeCoordinator {
    schedulers: CoordinatedSchedulers,
    intake_counter: Arc<IntakeEventCounter>,
    metrics: Arc<dyn IntakeMetrics>,
    lock: Mutex<()>,
}

impl IntakeCoordinator {
    pub fn new(
        schedulers: CoordinatedSchedulers,
        intake_counter: Arc<IntakeEventCounter>,
        metrics: Arc<dyn IntakeMetrics>,
    ) -> Self {
        Self {
            schedulers,
            intake_counter,
            metrics,
            lock: Mutex::new(()),
        }
    }

    /// Block until every stage and consumer has drained.
    pub fn flush_all(&self) -> Result<(), WiringError> {
        let _serialized = self.lock.lock();
        self.flush_stages()?;
        for consumer in &self.schedulers.consumers {
            consumer.flush()?;
        }
        self.metrics.record_flush_completed();
        debug!("Intake pipeline flushed");
        Ok(())
    }

    /// Drain the pipeline and drop all stage state.
    ///
    /// Events squelched at the orphan buffer are discarded, so per-peer
    /// intake counts are reset at the end.
    pub fn clear_all(&self) -> Result<(), WiringError> {
        let _serialized = self.lock.lock();
        info!("Clearing intake pipeline");

        let orphan_buffer = &self.schedulers.orphan_buffer;
        let paused_input = &self.schedulers.orphan_buffer_events;
        paused_input.start_squelching()?;
        let drained = orphan_buffer.flush().and_then(|()| self.flush_stages());
        if let Err(err) = paused_input.stop_squelching() {
            warn!(error = %err, "Failed to unpause orphan buffer input");
        }
        drained?;

        self.schedulers.deduplicator_clear.inject(());
        self.schedulers.orphan_buffer_clear.inject(());
        self.schedulers.deduplicator.flush()?;
        orphan_buffer.flush()?;

        self.intake_counter.reset();
        self.metrics.record_clear_completed();
        info!("Intake pipeline cleared");
        Ok(())
    }

    /// Items queued or executing across the intake stages.
    #[must_use]
    pub fn unprocessed_count(&self) -> usize {
        self.schedulers
            .stages
            .iter()
            .map(SchedulerHandle::unprocessed_count)
            .sum()
    }

    fn flush_stages(&self) -> Result<(), WiringError> {
        for stage in &self.schedulers.stages {
            stage.flush()?;
        }
        Ok(())
    }
}
