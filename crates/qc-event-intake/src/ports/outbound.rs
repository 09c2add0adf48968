//! # Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators the intake pipeline calls into. All are synchronous: they
//! are invoked from scheduler threads, never from an async runtime.

use shared_types::{EventDescriptor, EventWindow, GossipEvent, NodeId};

use crate::domain::stage::IntakeStage;

/// Checks a signature over a content hash.
///
/// Only the pass/fail contract matters to the pipeline.
pub trait SignatureVerifier: Send + Sync {
    /// True if `signature` over `data` verifies under `public_key`.
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Receives evidence of peers sending events with bad signatures.
pub trait MisbehaviorReporter: Send + Sync {
    /// An event from `creator`, delivered by `sender`, failed signature verification.
    fn report_invalid_signature(
        &self,
        creator: NodeId,
        sender: Option<NodeId>,
        event: &EventDescriptor,
    );
}

/// Observational sink for pipeline health. Implementations must not block.
pub trait IntakeMetrics: Send + Sync {
    /// A duplicate (same descriptor, same signature) was dropped.
    fn record_duplicate(&self);

    /// A duplicate descriptor arrived with a different signature.
    fn record_disparate_signature(&self);

    /// A stage dropped an event.
    fn record_dropped(&self, stage: IntakeStage, reason: &'static str);

    /// Number of events currently held by the orphan buffer.
    fn set_orphan_buffer_size(&self, size: usize);

    /// Unprocessed item count sampled from a scheduler.
    fn record_unprocessed(&self, scheduler: &str, count: usize);

    /// A pipeline flush completed.
    fn record_flush_completed(&self);

    /// A pipeline clear completed.
    fn record_clear_completed(&self);
}

/// Network layer: broadcasts released events and tracks which events it still
/// needs to request.
pub trait GossipGateway: Send + Sync {
    /// An event left the orphan buffer.
    fn event_released(&self, event: GossipEvent);

    /// The event window advanced.
    fn event_window_updated(&self, window: EventWindow);
}

/// Consensus engine: consumes topologically ordered events.
pub trait ConsensusGateway: Send + Sync {
    /// Add an event whose parents have all been delivered (or are ancient).
    fn add_event(&self, event: GossipEvent);
}
