//! # Adapters Layer (Hexagonal Architecture)
//!
//! Default implementations of the outbound ports.

pub mod ed25519;
pub mod misbehavior;
pub mod noop;

pub use ed25519::Ed25519Verifier;
pub use misbehavior::InMemoryMisbehaviorTracker;
pub use noop::{NoOpConsensusGateway, NoOpGossipGateway, NoOpIntakeMetrics};
