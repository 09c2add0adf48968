//! # Intake Container
//!
//! Builds the event intake service with the node's concrete collaborators.

mod config;

pub use config::{parse_address_book, ConfigError, NodeConfig};

use std::sync::Arc;

use qc_event_intake::{
    Ed25519Verifier, EventIntakeService, InMemoryMisbehaviorTracker, IntakeCollaborators,
    IntakeError,
};
use tracing::info;

use crate::adapters::{LoggingConsensusGateway, LoggingGossipGateway, PrometheusIntakeMetrics};

/// The assembled intake pipeline and the collaborators the runtime reads.
pub struct IntakeContainer {
    /// Intake pipeline service.
    pub service: Arc<EventIntakeService>,
    /// Invalid-signature reports received from the pipeline.
    pub misbehavior: Arc<InMemoryMisbehaviorTracker>,
}

impl IntakeContainer {
    /// Build the intake service. It is not started.
    pub fn new(config: &NodeConfig) -> Result<Self, IntakeError> {
        let misbehavior = Arc::new(InMemoryMisbehaviorTracker::new());
        let collaborators = IntakeCollaborators {
            verifier: Arc::new(Ed25519Verifier),
            misbehavior: misbehavior.clone(),
            metrics: Arc::new(PrometheusIntakeMetrics),
            gossip: Arc::new(LoggingGossipGateway),
            consensus: Arc::new(LoggingConsensusGateway),
            previous_address_book: None,
            current_address_book: config.address_book.clone(),
        };
        let service = Arc::new(EventIntakeService::new(config.intake.clone(), collaborators)?);

        info!(
            nodes = config.address_book.len(),
            total_weight = config.address_book.total_weight(),
            "Intake container initialized"
        );
        Ok(Self {
            service,
            misbehavior,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_event_intake::test_utils::TestNetwork;
    use qc_event_intake::EventIntakeApi;
    use quantum_telemetry::RELEASED_EVENTS;
    use shared_types::NodeId;

    #[test]
    fn test_container_runs_pipeline() {
        let network = TestNetwork::new(3, 5);
        let config = NodeConfig {
            address_book: network.address_book(),
            ..NodeConfig::default()
        };
        let container = IntakeContainer::new(&config).unwrap();
        let service = &container.service;
        service.start().unwrap();

        let before = RELEASED_EVENTS.get();
        service
            .submit_event(network.genesis_event(0).with_sender(NodeId(1)))
            .unwrap();
        service.flush_all().unwrap();

        assert!(RELEASED_EVENTS.get() >= before + 1.0);
        assert_eq!(service.unprocessed_count(), 0);
        assert_eq!(container.misbehavior.total_reports(), 0);
        service.stop();
    }
}
