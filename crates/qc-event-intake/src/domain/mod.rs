//! # Domain Layer
//!
//! Stage logic of the intake pipeline. Nothing here knows about schedulers
//! or wires; each stage is a plain struct driven by `wiring.rs`.

pub mod deduplicator;
pub mod errors;
pub mod event_window;
pub mod hasher;
pub mod intake_counter;
pub mod internal_validator;
pub mod orphan_buffer;
pub mod signature_validator;
pub mod stage;

pub use deduplicator::EventDeduplicator;
pub use errors::{IntakeError, SignatureCheckError, ValidationError};
pub use event_window::EventWindowTracker;
pub use hasher::{hash_data, EventHasher};
pub use intake_counter::IntakeEventCounter;
pub use internal_validator::InternalEventValidator;
pub use orphan_buffer::OrphanBuffer;
pub use signature_validator::{EventSignatureValidator, SignatureValidatorDeps};
pub use stage::IntakeStage;
