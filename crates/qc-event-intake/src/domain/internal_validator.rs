//! # Internal Event Validator
//!
//! Structural checks on a hashed event. Content of the signature is not
//! examined here, only its shape.

use std::sync::Arc;

use shared_types::{GossipEvent, IntakeStatus, EVENT_HASH_LEN, FIRST_GENERATION, MAX_PARENT_COUNT, SIGNATURE_LEN};
use tracing::warn;

use crate::domain::errors::ValidationError;
use crate::domain::intake_counter::IntakeEventCounter;
use crate::domain::stage::IntakeStage;
use crate::ports::outbound::IntakeMetrics;

/// Stateless structural validator.
pub struct InternalEventValidator {
    max_transaction_bytes: usize,
    single_node_network: bool,
    intake_counter: Arc<IntakeEventCounter>,
    metrics: Arc<dyn IntakeMetrics>,
}

impl InternalEventValidator {
    pub fn new(
        max_transaction_bytes: usize,
        single_node_network: bool,
        intake_counter: Arc<IntakeEventCounter>,
        metrics: Arc<dyn IntakeMetrics>,
    ) -> Self {
        Self {
            max_transaction_bytes,
            single_node_network,
            intake_counter,
            metrics,
        }
    }

    /// Forward the event if it is structurally valid; otherwise drop it.
    pub fn handle_event(&self, mut event: GossipEvent) -> Option<GossipEvent> {
        match self.validate(&event) {
            Ok(()) => {
                event.advance_status(IntakeStatus::StructurallyValid);
                Some(event)
            }
            Err(err) => {
                warn!(event = %event, sender = ?event.sender_id(), reason = %err, "Invalid event dropped");
                self.metrics
                    .record_dropped(IntakeStage::InternalValidator, err.label());
                self.intake_counter
                    .event_exited_intake_pipeline(event.sender_id());
                None
            }
        }
    }

    /// Run every structural check.
    pub fn validate(&self, event: &GossipEvent) -> Result<(), ValidationError> {
        let data = event.hashed_data();

        if !event.hash().is_well_formed() {
            return Err(ValidationError::InvalidHashLength {
                expected: EVENT_HASH_LEN,
                actual: event.hash().len(),
            });
        }

        if event.signature().len() != SIGNATURE_LEN {
            return Err(ValidationError::InvalidSignatureLength {
                expected: SIGNATURE_LEN,
                actual: event.signature().len(),
            });
        }

        let transaction_bytes = data.transaction_bytes();
        if transaction_bytes > self.max_transaction_bytes {
            return Err(ValidationError::TransactionBytesExceeded {
                size: transaction_bytes,
                limit: self.max_transaction_bytes,
            });
        }

        let parent_count = data.parent_count();
        if parent_count > MAX_PARENT_COUNT {
            return Err(ValidationError::TooManyParents {
                count: parent_count,
                max: MAX_PARENT_COUNT,
            });
        }

        for parent in data.parents() {
            if !parent.hash.is_well_formed() {
                return Err(ValidationError::InvalidParentHash {
                    creator: parent.creator,
                    actual: parent.hash.len(),
                });
            }
        }

        if let Some(self_parent) = &data.self_parent {
            if self_parent.creator != data.creator {
                return Err(ValidationError::SelfParentCreatorMismatch {
                    creator: data.creator,
                    parent: self_parent.creator,
                });
            }
        }

        let parents: Vec<_> = data.parents().collect();
        for (i, a) in parents.iter().enumerate() {
            if parents[i + 1..].iter().any(|b| b.hash == a.hash) && !self.single_node_network {
                return Err(ValidationError::DuplicateParent(a.creator));
            }
        }

        let expected_generation = data
            .parents()
            .map(|p| p.generation)
            .max()
            .map_or(FIRST_GENERATION, |g| g.saturating_add(1));
        if data.generation != expected_generation {
            return Err(ValidationError::InvalidGeneration {
                expected: expected_generation,
                actual: data.generation,
            });
        }

        if let Some(parent) = data.parents().find(|p| p.birth_round > data.birth_round) {
            return Err(ValidationError::BirthRoundBelowParent {
                birth_round: data.birth_round,
                parent_birth_round: parent.birth_round,
            });
        }

        Ok(())
    }
}
