//! # Event Signature Validator
//!
//! Verifies each event's signature against the creator's key in the
//! applicable address book:
//!
//! | Event software version | Address book |
//! |------------------------|--------------|
//! | equal to current       | current      |
//! | older than current     | previous (drop if none) |
//! | newer than current     | none, drop   |
//!
//! Failed verification is reported to the misbehavior tracker. Unknown
//! creators and missing keys are dropped without escalation.

use std::cmp::Ordering;
use std::sync::Arc;

use shared_types::{
    AddressBook, AddressBookUpdate, AncientMode, EventWindow, GossipEvent, IntakeStatus,
    SoftwareVersion,
};
use tracing::{info, trace, warn};

use crate::domain::errors::SignatureCheckError;
use crate::domain::event_window::EventWindowTracker;
use crate::domain::intake_counter::IntakeEventCounter;
use crate::domain::stage::IntakeStage;
use crate::ports::outbound::{IntakeMetrics, MisbehaviorReporter, SignatureVerifier};

/// Collaborators of the signature validator.
pub struct SignatureValidatorDeps {
    pub verifier: Arc<dyn SignatureVerifier>,
    pub misbehavior: Arc<dyn MisbehaviorReporter>,
    pub intake_counter: Arc<IntakeEventCounter>,
    pub metrics: Arc<dyn IntakeMetrics>,
}

/// Signature check stage.
pub struct EventSignatureValidator {
    software_version: SoftwareVersion,
    previous: Option<AddressBook>,
    current: AddressBook,
    window: EventWindowTracker,
    deps: SignatureValidatorDeps,
}

impl EventSignatureValidator {
    pub fn new(
        software_version: SoftwareVersion,
        previous: Option<AddressBook>,
        current: AddressBook,
        mode: AncientMode,
        deps: SignatureValidatorDeps,
    ) -> Self {
        Self {
            software_version,
            previous,
            current,
            window: EventWindowTracker::new(IntakeStage::SignatureValidator, mode),
            deps,
        }
    }

    /// Forward the event if its signature verifies.
    pub fn handle_event(&self, mut event: GossipEvent) -> Option<GossipEvent> {
        if self.window.is_ancient(event.ancient_indicator(self.window.ancient_mode())) {
            trace!(event = %event, "Ancient event dropped by signature validator");
            self.drop_event(&event, "ancient");
            return None;
        }

        match self.check(&event) {
            Ok(()) => {
                event.advance_status(IntakeStatus::SignatureVerified);
                Some(event)
            }
            Err(err) => {
                if err.is_misbehavior() {
                    warn!(event = %event, sender = ?event.sender_id(), reason = %err, "Event failed signature check");
                    self.deps.misbehavior.report_invalid_signature(
                        event.creator(),
                        event.sender_id(),
                        &event.descriptor(),
                    );
                } else {
                    warn!(event = %event, reason = %err, "Event signature not checkable, dropped");
                }
                self.drop_event(&event, err.label());
                None
            }
        }
    }

    /// Check the signature without side effects.
    pub fn check(&self, event: &GossipEvent) -> Result<(), SignatureCheckError> {
        let book = self.applicable_address_book(event.software_version())?;
        let creator = event.creator();
        let address = book
            .get(creator)
            .ok_or(SignatureCheckError::UnknownCreator(creator))?;
        let key = address
            .signing_key
            .as_deref()
            .ok_or(SignatureCheckError::MissingPublicKey(creator))?;

        if self
            .deps
            .verifier
            .verify(event.hash().as_bytes(), event.signature(), key)
        {
            Ok(())
        } else {
            Err(SignatureCheckError::InvalidSignature(creator))
        }
    }

    fn applicable_address_book(
        &self,
        event_version: SoftwareVersion,
    ) -> Result<&AddressBook, SignatureCheckError> {
        match event_version.cmp(&self.software_version) {
            Ordering::Equal => Ok(&self.current),
            Ordering::Less => self
                .previous
                .as_ref()
                .ok_or(SignatureCheckError::NoPreviousAddressBook(event_version)),
            Ordering::Greater => Err(SignatureCheckError::SoftwareVersionTooNew {
                event: event_version,
                current: self.software_version,
            }),
        }
    }

    /// Apply a new membership epoch. The outgoing current book becomes the
    /// previous book unless the update names one explicitly.
    pub fn update_address_book(&mut self, update: AddressBookUpdate) {
        let outgoing = std::mem::replace(&mut self.current, update.current);
        self.previous = update.previous.or(Some(outgoing));
        self.software_version = update.software_version;
        info!(
            software_version = %self.software_version,
            nodes = self.current.len(),
            "Signature validator address book updated"
        );
    }

    /// Advance the event window.
    pub fn set_event_window(&mut self, window: EventWindow) {
        self.window.advance(window);
    }

    /// Software version whose events use the current address book.
    #[must_use]
    pub fn software_version(&self) -> SoftwareVersion {
        self.software_version
    }

    fn drop_event(&self, event: &GossipEvent, reason: &'static str) {
        self.deps
            .metrics
            .record_dropped(IntakeStage::SignatureValidator, reason);
        self.deps
            .intake_counter
            .event_exited_intake_pipeline(event.sender_id());
    }
}
