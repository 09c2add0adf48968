//! # Inbound Ports (Driving Ports / API)
//!
//! The surface the rest of the node uses to drive event intake.

use std::sync::Arc;

use shared_types::{AddressBookUpdate, EventWindow, UnhashedEvent};

use crate::domain::errors::IntakeError;
use crate::domain::intake_counter::IntakeEventCounter;

/// Event intake API.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait EventIntakeApi: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Validate the wiring and begin accepting events. Fails with
    /// `IntakeError::Stopped` once the pipeline has been stopped.
    fn start(&self) -> Result<(), IntakeError>;

    /// Stop dedicated threads and heartbeats. Idempotent and final.
    fn stop(&self);

    // =========================================================================
    // Data
    // =========================================================================

    /// Hand a gossiped event to the hasher. Blocks while the pipeline is full.
    fn submit_event(&self, event: UnhashedEvent) -> Result<(), IntakeError>;

    /// Broadcast a new event window to every stage that discards old state.
    fn update_event_window(&self, window: EventWindow) -> Result<(), IntakeError>;

    /// Rotate the address books used by the signature validator.
    fn update_address_book(&self, update: AddressBookUpdate) -> Result<(), IntakeError>;

    // =========================================================================
    // Coordination
    // =========================================================================

    /// Block until every stage has drained.
    fn flush_all(&self) -> Result<(), IntakeError>;

    /// Drain the pipeline and reset all stage state (reconnect).
    fn clear_all(&self) -> Result<(), IntakeError>;

    /// Items queued or executing across all intake schedulers.
    fn unprocessed_count(&self) -> usize;

    /// Per-peer count of events inside the pipeline.
    fn intake_event_counter(&self) -> Arc<IntakeEventCounter>;
}
