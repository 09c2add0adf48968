//! Gateways that log released events.
//!
//! Consensus and gossip run outside this node binary; these adapters stand
//! at the pipeline boundary and record what would be handed over.

use qc_event_intake::{ConsensusGateway, GossipGateway};
use quantum_telemetry::RELEASED_EVENTS;
use shared_types::{EventWindow, GossipEvent};
use tracing::{debug, trace};

/// Consensus sink that logs and counts released events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConsensusGateway;

impl ConsensusGateway for LoggingConsensusGateway {
    fn add_event(&self, event: GossipEvent) {
        RELEASED_EVENTS.inc();
        debug!(
            event = %event,
            generation = event.generation(),
            birth_round = event.birth_round(),
            "Event released to consensus"
        );
    }
}

/// Gossip sink that logs released events and window updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingGossipGateway;

impl GossipGateway for LoggingGossipGateway {
    fn event_released(&self, event: GossipEvent) {
        trace!(event = %event, "Event available for gossip");
    }

    fn event_window_updated(&self, window: EventWindow) {
        debug!(
            latest_consensus_round = window.latest_consensus_round,
            ancient_threshold = window.ancient_threshold,
            mode = ?window.ancient_mode,
            "Gossip event window updated"
        );
    }
}
