//! # Test Utilities
//!
//! Signed-event builders and a recording metrics sink. Compiled for unit
//! tests and, behind the `test-utils` feature, for other crates' tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ed25519_dalek::{Signer, SigningKey};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{
    Address, AddressBook, EventWindow, GossipEvent, HashedEventData, NodeId, SoftwareVersion,
    UnhashedEvent, FIRST_GENERATION,
};

use crate::domain::hasher::{hash_data, EventHasher};
use crate::domain::stage::IntakeStage;
use crate::ports::outbound::{ConsensusGateway, GossipGateway, IntakeMetrics};

/// Software version used by events built with `TestNetwork`.
pub const TEST_SOFTWARE_VERSION: SoftwareVersion = SoftwareVersion(1);

// =============================================================================
// SIGNED EVENTS
// =============================================================================

/// A set of nodes `0..size` with deterministic Ed25519 keys.
pub struct TestNetwork {
    keys: Vec<SigningKey>,
    clock: AtomicU64,
}

impl TestNetwork {
    /// Keys are derived from `seed`, so equal seeds give equal networks.
    #[must_use]
    pub fn new(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let keys = (0..size)
            .map(|_| SigningKey::from_bytes(&rng.gen::<[u8; 32]>()))
            .collect();
        Self {
            keys,
            clock: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// Address book with weight 1 per node.
    #[must_use]
    pub fn address_book(&self) -> AddressBook {
        let mut book = AddressBook::new();
        for (index, key) in self.keys.iter().enumerate() {
            let address = Address {
                node_id: NodeId(index as u64),
                weight: 1,
                signing_key: Some(key.verifying_key().to_bytes().to_vec()),
            };
            if book.insert(address).is_err() {
                unreachable!("node ids are distinct and weights non-zero");
            }
        }
        book
    }

    /// Parentless event by `creator`.
    #[must_use]
    pub fn genesis_event(&self, creator: u64) -> UnhashedEvent {
        self.event_with_version(creator, TEST_SOFTWARE_VERSION)
    }

    /// Parentless event by `creator` stamped with `version`.
    #[must_use]
    pub fn event_with_version(&self, creator: u64, version: SoftwareVersion) -> UnhashedEvent {
        self.sign(HashedEventData {
            creator: NodeId(creator),
            software_version: version,
            generation: FIRST_GENERATION,
            birth_round: 1,
            time_created_nanos: self.tick(),
            ..Default::default()
        })
    }

    /// Event by `creator` with the given parents. A parent by the same
    /// creator becomes the self-parent; the rest are other-parents.
    #[must_use]
    pub fn child_event(&self, creator: u64, parents: &[&GossipEvent]) -> UnhashedEvent {
        let creator = NodeId(creator);
        let mut data = HashedEventData {
            creator,
            software_version: TEST_SOFTWARE_VERSION,
            generation: parents
                .iter()
                .map(|parent| parent.generation() + 1)
                .max()
                .unwrap_or(FIRST_GENERATION),
            birth_round: parents
                .iter()
                .map(|parent| parent.birth_round())
                .max()
                .unwrap_or(1),
            time_created_nanos: self.tick(),
            ..Default::default()
        };
        for parent in parents {
            if parent.creator() == creator && data.self_parent.is_none() {
                data.self_parent = Some(parent.descriptor());
            } else {
                data.other_parents.push(parent.descriptor());
            }
        }
        self.sign(data)
    }

    /// Hash and sign `data` with its creator's key.
    #[must_use]
    pub fn sign(&self, data: HashedEventData) -> UnhashedEvent {
        let hash = hash_data(&data);
        let key = &self.keys[data.creator.0 as usize];
        let signature = key.sign(hash.as_bytes()).to_bytes().to_vec();
        UnhashedEvent::new(data, signature)
    }

    /// Run the hasher over an event.
    #[must_use]
    pub fn hashed(&self, event: UnhashedEvent) -> GossipEvent {
        EventHasher::new().hash_event(event)
    }

    /// A valid random hashgraph of `count` events in creation order. Each
    /// event has its creator's latest event as self-parent and, usually,
    /// another node's latest event as other-parent.
    pub fn random_graph(&self, rng: &mut impl Rng, count: usize) -> Vec<GossipEvent> {
        let mut latest: Vec<Option<GossipEvent>> = vec![None; self.size()];
        let mut events = Vec::with_capacity(count);

        for _ in 0..count {
            let creator = rng.gen_range(0..self.size());
            let other = rng.gen_range(0..self.size());

            let mut parents: Vec<&GossipEvent> = Vec::new();
            if let Some(self_parent) = &latest[creator] {
                parents.push(self_parent);
            }
            if other != creator && rng.gen_bool(0.8) {
                if let Some(other_parent) = &latest[other] {
                    parents.push(other_parent);
                }
            }

            let event = self.hashed(self.child_event(creator as u64, &parents));
            latest[creator] = Some(event.clone());
            events.push(event);
        }
        events
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }
}

// =============================================================================
// METRICS
// =============================================================================

#[derive(Debug, Default)]
struct Recorded {
    duplicates: usize,
    disparate_signatures: usize,
    dropped: HashMap<(IntakeStage, &'static str), usize>,
    orphan_buffer_size: usize,
    unprocessed: HashMap<String, usize>,
    flushes: usize,
    clears: usize,
}

/// `IntakeMetrics` that remembers everything it is told.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    recorded: Mutex<Recorded>,
}

impl RecordingMetrics {
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.recorded.lock().duplicates
    }

    #[must_use]
    pub fn disparate_signatures(&self) -> usize {
        self.recorded.lock().disparate_signatures
    }

    /// Drops recorded for one stage and reason.
    #[must_use]
    pub fn dropped(&self, stage: IntakeStage, reason: &'static str) -> usize {
        self.recorded
            .lock()
            .dropped
            .get(&(stage, reason))
            .copied()
            .unwrap_or(0)
    }

    /// Drops recorded for one stage, any reason.
    #[must_use]
    pub fn dropped_by(&self, stage: IntakeStage) -> usize {
        self.recorded
            .lock()
            .dropped
            .iter()
            .filter(|((s, _), _)| *s == stage)
            .map(|(_, count)| count)
            .sum()
    }

    #[must_use]
    pub fn orphan_buffer_size(&self) -> usize {
        self.recorded.lock().orphan_buffer_size
    }

    /// Last unprocessed sample for `scheduler`.
    #[must_use]
    pub fn last_unprocessed(&self, scheduler: &str) -> Option<usize> {
        self.recorded.lock().unprocessed.get(scheduler).copied()
    }

    #[must_use]
    pub fn flushes(&self) -> usize {
        self.recorded.lock().flushes
    }

    #[must_use]
    pub fn clears(&self) -> usize {
        self.recorded.lock().clears
    }
}

impl IntakeMetrics for RecordingMetrics {
    fn record_duplicate(&self) {
        self.recorded.lock().duplicates += 1;
    }

    fn record_disparate_signature(&self) {
        self.recorded.lock().disparate_signatures += 1;
    }

    fn record_dropped(&self, stage: IntakeStage, reason: &'static str) {
        *self
            .recorded
            .lock()
            .dropped
            .entry((stage, reason))
            .or_insert(0) += 1;
    }

    fn set_orphan_buffer_size(&self, size: usize) {
        self.recorded.lock().orphan_buffer_size = size;
    }

    fn record_unprocessed(&self, scheduler: &str, count: usize) {
        self.recorded
            .lock()
            .unprocessed
            .insert(scheduler.to_string(), count);
    }

    fn record_flush_completed(&self) {
        self.recorded.lock().flushes += 1;
    }

    fn record_clear_completed(&self) {
        self.recorded.lock().clears += 1;
    }
}

// =============================================================================
// GATEWAYS
// =============================================================================

/// Gossip and consensus gateway that keeps what it receives.
#[derive(Debug, Default)]
pub struct CollectingGateway {
    events: Mutex<Vec<GossipEvent>>,
    windows: Mutex<Vec<EventWindow>>,
}

impl CollectingGateway {
    /// Events received so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<GossipEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Windows received so far.
    #[must_use]
    pub fn windows(&self) -> Vec<EventWindow> {
        self.windows.lock().clone()
    }
}

impl ConsensusGateway for CollectingGateway {
    fn add_event(&self, event: GossipEvent) {
        self.events.lock().push(event);
    }
}

impl GossipGateway for CollectingGateway {
    fn event_released(&self, event: GossipEvent) {
        self.events.lock().push(event);
    }

    fn event_window_updated(&self, window: EventWindow) {
        self.windows.lock().push(window);
    }
}
