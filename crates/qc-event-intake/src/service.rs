//! # Event Intake Service
//!
//! Application service implementing `EventIntakeApi` on top of the wired
//! pipeline. Owns the wiring model; dropping the service stops it.

use std::sync::Arc;

use shared_types::{AddressBookUpdate, EventWindow, UnhashedEvent};
use shared_wiring::{SchedulerHandle, WiringError};
use tracing::info;

use crate::config::IntakeConfig;
use crate::domain::errors::IntakeError;
use crate::domain::intake_counter::IntakeEventCounter;
use crate::ports::inbound::EventIntakeApi;
use crate::wiring::{IntakeCollaborators, IntakeWiring};

/// Event intake pipeline service.
pub struct EventIntakeService {
    wiring: IntakeWiring,
    intake_counter: Arc<IntakeEventCounter>,
}

impl EventIntakeService {
    /// Validate `config` and build the pipeline. Call `start()` before
    /// submitting events.
    pub fn new(config: IntakeConfig, collaborators: IntakeCollaborators) -> Result<Self, IntakeError> {
        config.validate()?;
        let intake_counter = Arc::new(IntakeEventCounter::new());
        let wiring = IntakeWiring::build(&config, collaborators, Arc::clone(&intake_counter))?;
        info!(
            software_version = %config.software_version,
            ancient_mode = ?config.ancient_mode,
            "Event intake pipeline built"
        );
        Ok(Self {
            wiring,
            intake_counter,
        })
    }

    /// True between `start()` and `stop()`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.wiring.model.is_started()
    }

    /// Look up a scheduler of the pipeline by name.
    #[must_use]
    pub fn scheduler(&self, name: &str) -> Option<SchedulerHandle> {
        self.wiring.scheduler(name)
    }

    /// Mermaid flowchart of the pipeline's schedulers and connections.
    #[must_use]
    pub fn wiring_diagram(&self) -> String {
        self.wiring.model.diagram()
    }

    /// Unprocessed count of every scheduler, in build order.
    #[must_use]
    pub fn unprocessed_counts(&self) -> Vec<(String, usize)> {
        self.wiring.model.unprocessed_counts()
    }

    fn ensure_running(&self) -> Result<(), IntakeError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(IntakeError::NotRunning)
        }
    }
}

impl EventIntakeApi for EventIntakeService {
    fn start(&self) -> Result<(), IntakeError> {
        self.wiring.model.start().map_err(|err| match err {
            WiringError::AlreadyStarted => IntakeError::AlreadyStarted,
            WiringError::Stopped => IntakeError::Stopped,
            other => IntakeError::Wiring(other),
        })
    }

    fn stop(&self) {
        self.wiring.model.stop();
    }

    fn submit_event(&self, event: UnhashedEvent) -> Result<(), IntakeError> {
        self.ensure_running()?;
        self.intake_counter
            .event_entered_intake_pipeline(event.sender_id);
        self.wiring.event_input.put(event);
        Ok(())
    }

    fn update_event_window(&self, window: EventWindow) -> Result<(), IntakeError> {
        self.ensure_running()?;
        self.wiring.event_window_input.put(window);
        Ok(())
    }

    fn update_address_book(&self, update: AddressBookUpdate) -> Result<(), IntakeError> {
        self.ensure_running()?;
        self.wiring.address_book_input.inject(update);
        Ok(())
    }

    fn flush_all(&self) -> Result<(), IntakeError> {
        self.ensure_running()?;
        self.wiring.coordinator.flush_all()?;
        Ok(())
    }

    fn clear_all(&self) -> Result<(), IntakeError> {
        self.ensure_running()?;
        self.wiring.coordinator.clear_all()?;
        Ok(())
    }

    fn unprocessed_count(&self) -> usize {
        self.wiring.coordinator.unprocessed_count()
    }

    fn intake_event_counter(&self) -> Arc<IntakeEventCounter> {
        Arc::clone(&self.intake_counter)
    }
}
