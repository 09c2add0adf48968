//! No-op collaborators for tests and for nodes that do not need a sink.

use shared_types::{EventWindow, GossipEvent};

use crate::domain::stage::IntakeStage;
use crate::ports::outbound::{ConsensusGateway, GossipGateway, IntakeMetrics};

/// Discards all metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpIntakeMetrics;

impl IntakeMetrics for NoOpIntakeMetrics {
    fn record_duplicate(&self) {}
    fn record_disparate_signature(&self) {}
    fn record_dropped(&self, _stage: IntakeStage, _reason: &'static str) {}
    fn set_orphan_buffer_size(&self, _size: usize) {}
    fn record_unprocessed(&self, _scheduler: &str, _count: usize) {}
    fn record_flush_completed(&self) {}
    fn record_clear_completed(&self) {}
}

/// Ignores released events and window updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpGossipGateway;

impl GossipGateway for NoOpGossipGateway {
    fn event_released(&self, _event: GossipEvent) {}
    fn event_window_updated(&self, _window: EventWindow) {}
}

/// Ignores released events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpConsensusGateway;

impl ConsensusGateway for NoOpConsensusGateway {
    fn add_event(&self, _event: GossipEvent) {}
}
