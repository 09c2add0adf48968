//! # Intake Pipeline Wiring
//!
//! Builds every scheduler of the intake pipeline on one `WiringModel` and
//! solders them together:
//!
//! ```text
//!  submit ─► event_hasher ─► post_hash_collector ─► internal_event_validator
//!              (shared hashing counter)                       │
//!                                                             ▼
//!  orphan_buffer ◄─ event_signature_validator ◄─ event_deduplicator
//!       │ split
//!       ├──────────► consensus_consumer
//!       └─(inject)─► gossip_consumer ──► network (may resubmit)
//!
//!  update_event_window ─► event_window_manager ─(inject)─► deduplicator,
//!                             signature validator, orphan buffer, gossip
//!  heartbeat ─(offer)─► health_monitor
//! ```
//!
//! Stage state lives behind a `parking_lot::Mutex` captured by each handler;
//! all inputs of one stage share the same lock.

use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{AddressBook, AddressBookUpdate, EventWindow, GossipEvent, UnhashedEvent};
use shared_wiring::{
    BackpressureObjectCounter, InputWire, NoOpObjectCounter, ObjectCounter, SchedulerHandle,
    SolderType, TaskSchedulerType, WiringError, WiringModel, DEFAULT_SLEEP_DURATION,
};
use tracing::debug;

use crate::config::IntakeConfig;
use crate::coordinator::{CoordinatedSchedulers, IntakeCoordinator};
use crate::domain::{
    EventDeduplicator, EventHasher, EventSignatureValidator, IntakeEventCounter, IntakeStage,
    InternalEventValidator, OrphanBuffer, SignatureValidatorDeps,
};
use crate::health::HealthMonitor;
use crate::ports::outbound::{
    ConsensusGateway, GossipGateway, IntakeMetrics, MisbehaviorReporter, SignatureVerifier,
};

pub const EVENT_WINDOW_MANAGER: &str = "event_window_manager";
pub const CONSENSUS_CONSUMER: &str = "consensus_consumer";
pub const GOSSIP_CONSUMER: &str = "gossip_consumer";
pub const HEALTH_MONITOR: &str = "health_monitor";

/// External collaborators of the intake pipeline.
#[derive(Clone)]
pub struct IntakeCollaborators {
    pub verifier: Arc<dyn SignatureVerifier>,
    pub misbehavior: Arc<dyn MisbehaviorReporter>,
    pub metrics: Arc<dyn IntakeMetrics>,
    pub gossip: Arc<dyn GossipGateway>,
    pub consensus: Arc<dyn ConsensusGateway>,
    /// Book for events from older software versions.
    pub previous_address_book: Option<AddressBook>,
    /// Book for events from the current software version.
    pub current_address_book: AddressBook,
}

/// The built pipeline: its model, entry points and coordinator.
pub struct IntakeWiring {
    pub model: WiringModel,
    pub event_input: InputWire<UnhashedEvent>,
    pub event_window_input: InputWire<EventWindow>,
    pub address_book_input: InputWire<AddressBookUpdate>,
    pub coordinator: IntakeCoordinator,
}

fn describe_unhashed(event: &UnhashedEvent) -> String {
    format!(
        "unhashed event by {} at generation {}",
        event.hashed_data.creator, event.hashed_data.generation
    )
}

fn describe_event(event: &GossipEvent) -> String {
    event.to_string()
}

impl IntakeWiring {
    /// Build and solder every scheduler. Nothing runs until `model.start()`.
    pub fn build(
        config: &IntakeConfig,
        collaborators: IntakeCollaborators,
        intake_counter: Arc<IntakeEventCounter>,
    ) -> Result<Self, WiringError> {
        let schedulers = &config.schedulers;
        let metrics = Arc::clone(&collaborators.metrics);
        let model = WiringModel::new(config.worker_threads)?;

        // =====================================================================
        // Hasher + post-hash collector (one shared counter)
        // =====================================================================
        let hashing_counter: Arc<dyn ObjectCounter> = Arc::new(BackpressureObjectCounter::new(
            "hashing",
            schedulers.hashing_counter_capacity,
            DEFAULT_SLEEP_DURATION,
        ));

        let hasher = model
            .scheduler_builder(IntakeStage::Hasher.as_str())
            .configure(&schedulers.event_hasher)
            .with_on_ramp(Arc::clone(&hashing_counter))
            .with_off_ramp(Arc::new(NoOpObjectCounter))
            .build::<GossipEvent>()?;
        let hasher_input = hasher
            .build_input_wire::<UnhashedEvent>("unhashed_events")
            .with_describer(describe_unhashed);
        let event_hasher = EventHasher::new();
        hasher_input.bind(move |event| Some(event_hasher.hash_event(event)))?;

        let collector = model
            .scheduler_builder(IntakeStage::PostHashCollector.as_str())
            .configure(&schedulers.post_hash_collector)
            .with_on_ramp(Arc::new(NoOpObjectCounter))
            .with_off_ramp(hashing_counter)
            .build::<GossipEvent>()?;
        let collector_input = collector
            .build_input_wire::<GossipEvent>("hashed_events")
            .with_describer(describe_event);
        collector_input.bind(Some)?;
        hasher
            .output_wire()
            .solder_to(&collector_input.input_wire(), SolderType::Standard);

        // =====================================================================
        // Internal validator
        // =====================================================================
        let validator = model
            .scheduler_builder(IntakeStage::InternalValidator.as_str())
            .configure(&schedulers.internal_event_validator)
            .build::<GossipEvent>()?;
        let validator_input = validator
            .build_input_wire::<GossipEvent>("hashed_events")
            .with_describer(describe_event);
        let internal_validator = InternalEventValidator::new(
            config.max_transaction_bytes_per_event,
            config.single_node_network,
            Arc::clone(&intake_counter),
            Arc::clone(&metrics),
        );
        validator_input.bind(move |event| internal_validator.handle_event(event))?;
        collector
            .output_wire()
            .solder_to(&validator_input.input_wire(), SolderType::Standard);

        // =====================================================================
        // Deduplicator
        // =====================================================================
        let dedup = model
            .scheduler_builder(IntakeStage::Deduplicator.as_str())
            .configure(&schedulers.event_deduplicator)
            .build::<GossipEvent>()?;
        let deduplicator = Arc::new(Mutex::new(EventDeduplicator::new(
            config.ancient_mode,
            Arc::clone(&intake_counter),
            Arc::clone(&metrics),
        )));

        let dedup_events = dedup
            .build_input_wire::<GossipEvent>("validated_events")
            .with_describer(describe_event);
        let state = Arc::clone(&deduplicator);
        dedup_events.bind(move |event| state.lock().handle_event(event))?;

        let dedup_window = dedup.build_input_wire::<EventWindow>("event_window");
        let state = Arc::clone(&deduplicator);
        dedup_window.bind_consumer(move |window| state.lock().set_event_window(window))?;

        let dedup_clear = dedup.build_input_wire::<()>("clear");
        let state = deduplicator;
        dedup_clear.bind_consumer(move |()| state.lock().clear())?;

        validator
            .output_wire()
            .solder_to(&dedup_events.input_wire(), SolderType::Standard);

        // =====================================================================
        // Signature validator
        // =====================================================================
        let sigval = model
            .scheduler_builder(IntakeStage::SignatureValidator.as_str())
            .configure(&schedulers.event_signature_validator)
            .build::<GossipEvent>()?;
        let signature_validator = Arc::new(Mutex::new(EventSignatureValidator::new(
            config.software_version,
            collaborators.previous_address_book,
            collaborators.current_address_book,
            config.ancient_mode,
            SignatureValidatorDeps {
                verifier: collaborators.verifier,
                misbehavior: collaborators.misbehavior,
                intake_counter: Arc::clone(&intake_counter),
                metrics: Arc::clone(&metrics),
            },
        )));

        let sigval_events = sigval
            .build_input_wire::<GossipEvent>("unique_events")
            .with_describer(describe_event);
        let state = Arc::clone(&signature_validator);
        sigval_events.bind(move |event| state.lock().handle_event(event))?;

        let sigval_window = sigval.build_input_wire::<EventWindow>("event_window");
        let state = Arc::clone(&signature_validator);
        sigval_window.bind_consumer(move |window| state.lock().set_event_window(window))?;

        let sigval_address_book = sigval.build_input_wire::<AddressBookUpdate>("address_book");
        let state = signature_validator;
        sigval_address_book.bind_consumer(move |update| state.lock().update_address_book(update))?;

        dedup
            .output_wire()
            .solder_to(&sigval_events.input_wire(), SolderType::Standard);

        // =====================================================================
        // Orphan buffer
        // =====================================================================
        let orphans = model
            .scheduler_builder(IntakeStage::OrphanBuffer.as_str())
            .configure(&schedulers.orphan_buffer)
            .build::<Vec<GossipEvent>>()?;
        let orphan_buffer = Arc::new(Mutex::new(OrphanBuffer::new(
            config.ancient_mode,
            Arc::clone(&intake_counter),
            Arc::clone(&metrics),
        )));

        let orphan_events = orphans
            .build_input_wire::<GossipEvent>("verified_events")
            .with_describer(describe_event);
        let state = Arc::clone(&orphan_buffer);
        orphan_events.bind(move |event| non_empty(state.lock().handle_event(event)))?;

        let orphan_window = orphans.build_input_wire::<EventWindow>("event_window");
        let state = Arc::clone(&orphan_buffer);
        orphan_window.bind(move |window| non_empty(state.lock().set_event_window(window)))?;

        let orphan_clear = orphans.build_input_wire::<()>("clear");
        let state = orphan_buffer;
        orphan_clear.bind(move |()| {
            state.lock().clear();
            None
        })?;

        sigval
            .output_wire()
            .solder_to(&orphan_events.input_wire(), SolderType::Standard);

        // =====================================================================
        // Consumers of released events
        // =====================================================================
        let released = orphans.output_wire().build_splitter("released_events");

        let consensus = model
            .scheduler_builder(CONSENSUS_CONSUMER)
            .configure(&schedulers.consensus_consumer)
            .build::<()>()?;
        let consensus_events = consensus
            .build_input_wire::<GossipEvent>("released_events")
            .with_describer(describe_event);
        let gateway = collaborators.consensus;
        consensus_events.bind_consumer(move |event| gateway.add_event(event))?;
        released.solder_to(&consensus_events.input_wire(), SolderType::Standard);

        // Gossip may resubmit released events, closing a cycle; inject so
        // the orphan buffer never blocks on it.
        let gossip = model
            .scheduler_builder(GOSSIP_CONSUMER)
            .configure(&schedulers.gossip_consumer)
            .build::<()>()?;
        let gossip_events = gossip
            .build_input_wire::<GossipEvent>("released_events")
            .with_describer(describe_event);
        let gateway = Arc::clone(&collaborators.gossip);
        gossip_events.bind_consumer(move |event| gateway.event_released(event))?;
        released.solder_to(&gossip_events.input_wire(), SolderType::Inject);

        let gossip_window = gossip.build_input_wire::<EventWindow>("event_window");
        let gateway = collaborators.gossip;
        gossip_window.bind_consumer(move |window| gateway.event_window_updated(window))?;

        // =====================================================================
        // Event window fan-out
        // =====================================================================
        let window_manager = model
            .scheduler_builder(EVENT_WINDOW_MANAGER)
            .with_type(TaskSchedulerType::Direct)
            .with_flushing_enabled(true)
            .build::<EventWindow>()?;
        let window_input = window_manager.build_input_wire::<EventWindow>("event_window");
        window_input.bind(|window| {
            debug!(
                threshold = window.ancient_threshold,
                round = window.latest_consensus_round,
                "Event window update"
            );
            Some(window)
        })?;
        let window_output = window_manager.output_wire();
        window_output.solder_to(&dedup_window.input_wire(), SolderType::Inject);
        window_output.solder_to(&sigval_window.input_wire(), SolderType::Inject);
        window_output.solder_to(&orphan_window.input_wire(), SolderType::Inject);
        window_output.solder_to(&gossip_window.input_wire(), SolderType::Inject);

        // =====================================================================
        // Health monitor
        // =====================================================================
        let stages = vec![
            hasher.handle(),
            collector.handle(),
            validator.handle(),
            dedup.handle(),
            sigval.handle(),
            orphans.handle(),
        ];
        let consumers = vec![consensus.handle(), gossip.handle()];

        let monitored = stages.iter().chain(consumers.iter()).cloned().collect::<Vec<_>>();
        let monitor = Mutex::new(HealthMonitor::new(
            monitored,
            Arc::clone(&metrics),
            config.unprocessed_warning_threshold,
        ));
        let health = model
            .scheduler_builder(HEALTH_MONITOR)
            .with_type(TaskSchedulerType::Sequential)
            .with_unhandled_capacity(1)
            .build::<()>()?;
        let heartbeats = health.build_input_wire::<std::time::Instant>("heartbeat");
        heartbeats.bind_consumer(move |_| monitor.lock().check())?;
        model
            .build_heartbeat_wire(config.heartbeat_period)
            .solder_to(&heartbeats.input_wire(), SolderType::Offer);

        let coordinator = IntakeCoordinator::new(
            CoordinatedSchedulers {
                stages,
                consumers,
                deduplicator: dedup.handle(),
                orphan_buffer: orphans.handle(),
                orphan_buffer_events: orphan_events.input_wire(),
                deduplicator_clear: dedup_clear.input_wire(),
                orphan_buffer_clear: orphan_clear.input_wire(),
            },
            intake_counter,
            metrics,
        );

        Ok(Self {
            model,
            event_input: hasher_input.input_wire(),
            event_window_input: window_input.input_wire(),
            address_book_input: sigval_address_book.input_wire(),
            coordinator,
        })
    }

    /// Handles of every scheduler in the model, by name.
    #[must_use]
    pub fn scheduler(&self, name: &str) -> Option<SchedulerHandle> {
        self.model.scheduler(name)
    }
}

fn non_empty(events: Vec<GossipEvent>) -> Option<Vec<GossipEvent>> {
    (!events.is_empty()).then_some(events)
}
