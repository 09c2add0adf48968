//! # Event Intake Subsystem
//!
//! Turns gossiped hashgraph events into a topologically ordered stream for
//! consensus.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): stage logic (hasher, validators,
//!   deduplicator, orphan buffer), no scheduling
//! - **Ports Layer** (`ports/`): inbound API and outbound collaborators
//! - **Adapters Layer** (`adapters/`): Ed25519 verifier, no-op sinks,
//!   in-memory misbehavior tracker
//! - **Wiring** (`wiring.rs`): stages placed on `shared-wiring` schedulers
//! - **Service Layer** (`service.rs`): implements `EventIntakeApi`
//!
//! ## Pipeline
//!
//! ```text
//! hasher → collector → internal validator → deduplicator
//!        → signature validator → orphan buffer → consensus + gossip
//! ```
//!
//! ## Drop Policy
//!
//! - Malformed events: dropped, never retried
//! - Duplicates: dropped silently, counted
//! - Bad signatures: dropped and reported as misbehavior
//! - Orphans: buffered until parents arrive or become ancient

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod health;
pub mod ports;
pub mod service;
pub mod wiring;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export public API
pub use adapters::{
    Ed25519Verifier, InMemoryMisbehaviorTracker, NoOpConsensusGateway, NoOpGossipGateway,
    NoOpIntakeMetrics,
};
pub use config::{ConfigError, IntakeConfig, IntakeSchedulersConfig};
pub use coordinator::IntakeCoordinator;
pub use domain::{
    hash_data, EventDeduplicator, EventHasher, EventSignatureValidator, IntakeError,
    IntakeEventCounter, IntakeStage, InternalEventValidator, OrphanBuffer, SignatureCheckError,
    ValidationError,
};
pub use health::HealthMonitor;
pub use ports::inbound::EventIntakeApi;
pub use ports::outbound::{
    ConsensusGateway, GossipGateway, IntakeMetrics, MisbehaviorReporter, SignatureVerifier,
};
pub use service::EventIntakeService;
pub use wiring::{IntakeCollaborators, IntakeWiring};
