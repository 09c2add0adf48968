//! # Pipeline Harness
//!
//! A running `EventIntakeService` wired to collecting gateways, a recording
//! metrics sink and a real Ed25519 verifier.

use std::sync::{Arc, OnceLock, Weak};

use qc_event_intake::test_utils::{CollectingGateway, RecordingMetrics, TestNetwork};
use qc_event_intake::{
    Ed25519Verifier, EventIntakeApi, EventIntakeService, GossipGateway,
    InMemoryMisbehaviorTracker, IntakeCollaborators, IntakeConfig,
};
use shared_types::{EventWindow, GossipEvent, UnhashedEvent};

/// Service under test plus everything it talks to.
pub struct Pipeline {
    pub service: Arc<EventIntakeService>,
    pub network: TestNetwork,
    pub consensus: Arc<CollectingGateway>,
    pub gossip: Arc<CollectingGateway>,
    pub metrics: Arc<RecordingMetrics>,
    pub misbehavior: Arc<InMemoryMisbehaviorTracker>,
}

impl Pipeline {
    /// Started pipeline over a `nodes`-member network.
    pub fn start(nodes: usize, seed: u64) -> Self {
        Self::start_with(nodes, seed, IntakeConfig::default(), None)
    }

    /// Started pipeline with an explicit config. When `echo` is set, released
    /// events reach it instead of the collecting gossip gateway.
    pub fn start_with(
        nodes: usize,
        seed: u64,
        config: IntakeConfig,
        echo: Option<Arc<EchoGossip>>,
    ) -> Self {
        let network = TestNetwork::new(nodes, seed);
        let consensus = Arc::new(CollectingGateway::default());
        let gossip = Arc::new(CollectingGateway::default());
        let metrics = Arc::new(RecordingMetrics::default());
        let misbehavior = Arc::new(InMemoryMisbehaviorTracker::new());

        let gossip_gateway: Arc<dyn GossipGateway> = match &echo {
            Some(echo) => echo.clone(),
            None => gossip.clone(),
        };
        let service = Arc::new(
            EventIntakeService::new(
                config,
                IntakeCollaborators {
                    verifier: Arc::new(Ed25519Verifier),
                    misbehavior: misbehavior.clone(),
                    metrics: metrics.clone(),
                    gossip: gossip_gateway,
                    consensus: consensus.clone(),
                    previous_address_book: None,
                    current_address_book: network.address_book(),
                },
            )
            .expect("pipeline builds"),
        );
        if let Some(echo) = &echo {
            echo.attach(&service);
        }
        service.start().expect("pipeline starts");

        Self {
            service,
            network,
            consensus,
            gossip,
            metrics,
            misbehavior,
        }
    }

    /// Submit and flush.
    pub fn submit(&self, event: UnhashedEvent) {
        self.service.submit_event(event).expect("pipeline running");
        self.service.flush_all().expect("flush succeeds");
    }

    /// Advance the event window and flush.
    pub fn advance(&self, window: EventWindow) {
        self.service
            .update_event_window(window)
            .expect("pipeline running");
        self.service.flush_all().expect("flush succeeds");
    }

    /// Events released to consensus so far.
    pub fn released(&self) -> Vec<GossipEvent> {
        self.consensus.events()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.service.stop();
    }
}

/// Gossip gateway that re-submits every released event, the way a peer
/// echoing our own events back would.
#[derive(Default)]
pub struct EchoGossip {
    service: OnceLock<Weak<EventIntakeService>>,
    windows: CollectingGateway,
}

impl EchoGossip {
    fn attach(&self, service: &Arc<EventIntakeService>) {
        let _ = self.service.set(Arc::downgrade(service));
    }

    /// Windows received so far.
    pub fn windows(&self) -> Vec<EventWindow> {
        self.windows.windows()
    }
}

impl GossipGateway for EchoGossip {
    fn event_released(&self, event: GossipEvent) {
        if let Some(service) = self.service.get().and_then(Weak::upgrade) {
            // Stopped pipelines reject the echo; nothing to do.
            let _ = service.submit_event(UnhashedEvent::from(event));
        }
    }

    fn event_window_updated(&self, window: EventWindow) {
        self.windows.event_window_updated(window);
    }
}

/// True if every parent of every event in `events` that also appears in
/// `events` appears earlier.
pub fn is_topologically_ordered(events: &[GossipEvent]) -> bool {
    use std::collections::HashMap;

    let position: HashMap<_, _> = events
        .iter()
        .enumerate()
        .map(|(index, event)| (event.descriptor(), index))
        .collect();
    events.iter().enumerate().all(|(index, event)| {
        event
            .parents()
            .all(|parent| position.get(parent).map_or(true, |&p| p < index))
    })
}
