//! # Intake Errors
//!
//! Reasons an event is dropped, and errors from the service API.
//!
//! Stage failures never cross a wire: each stage converts them into a log
//! line, a metric and a dropped event.

use shared_types::{NodeId, SoftwareVersion};
use shared_wiring::WiringError;
use thiserror::Error;

use crate::config::ConfigError;

/// Structural defects found by the internal validator.
///
/// Malformed data never becomes valid later; these are never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Event hash is empty or not `EVENT_HASH_LEN` bytes.
    #[error("Invalid event hash length: expected {expected}, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    /// A parent reference carries a malformed hash.
    #[error("Parent by creator {creator} has invalid hash length {actual}")]
    InvalidParentHash { creator: NodeId, actual: usize },

    /// More than a self-parent and one other-parent.
    #[error("Too many parents: {count} (max {max})")]
    TooManyParents { count: usize, max: usize },

    /// The same parent is referenced twice.
    #[error("Duplicate parent reference to creator {0}")]
    DuplicateParent(NodeId),

    /// Self-parent was created by a different node.
    #[error("Self-parent created by {parent}, event created by {creator}")]
    SelfParentCreatorMismatch { creator: NodeId, parent: NodeId },

    /// Generation is not one more than the highest parent generation.
    #[error("Invalid generation: expected {expected}, got {actual}")]
    InvalidGeneration { expected: u64, actual: u64 },

    /// Birth round is lower than a parent's birth round.
    #[error("Birth round {birth_round} below parent birth round {parent_birth_round}")]
    BirthRoundBelowParent {
        birth_round: u64,
        parent_birth_round: u64,
    },

    /// Signature is missing or not `SIGNATURE_LEN` bytes.
    #[error("Invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    /// Transactions exceed the per-event byte limit.
    #[error("Transaction bytes {size} exceed limit {limit}")]
    TransactionBytesExceeded { size: usize, limit: usize },
}

impl ValidationError {
    /// Short label for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidHashLength { .. } => "invalid_hash",
            Self::InvalidParentHash { .. } => "invalid_parent_hash",
            Self::TooManyParents { .. } => "too_many_parents",
            Self::DuplicateParent(_) => "duplicate_parent",
            Self::SelfParentCreatorMismatch { .. } => "self_parent_creator",
            Self::InvalidGeneration { .. } => "invalid_generation",
            Self::BirthRoundBelowParent { .. } => "invalid_birth_round",
            Self::InvalidSignatureLength { .. } => "invalid_signature_length",
            Self::TransactionBytesExceeded { .. } => "transaction_bytes",
        }
    }
}

/// Reasons the signature validator rejects an event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureCheckError {
    /// Event was created by newer software than this node runs.
    #[error("Event software version {event} is newer than current {current}")]
    SoftwareVersionTooNew {
        event: SoftwareVersion,
        current: SoftwareVersion,
    },

    /// Event is from older software and no previous address book is known.
    #[error("No previous address book for event software version {0}")]
    NoPreviousAddressBook(SoftwareVersion),

    /// Creator is not in the applicable address book.
    #[error("Creator {0} not in applicable address book")]
    UnknownCreator(NodeId),

    /// Creator has no signing key on record.
    #[error("Creator {0} has no public key")]
    MissingPublicKey(NodeId),

    /// Signature does not verify.
    #[error("Invalid signature from creator {0}")]
    InvalidSignature(NodeId),
}

impl SignatureCheckError {
    /// Short label for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::SoftwareVersionTooNew { .. } => "software_version_too_new",
            Self::NoPreviousAddressBook(_) => "no_previous_address_book",
            Self::UnknownCreator(_) => "unknown_creator",
            Self::MissingPublicKey(_) => "missing_public_key",
            Self::InvalidSignature(_) => "invalid_signature",
        }
    }

    /// True if the failure points at a misbehaving peer.
    #[must_use]
    pub fn is_misbehavior(&self) -> bool {
        matches!(self, Self::InvalidSignature(_))
    }
}

/// Errors returned by the intake service API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// Operation requires a started pipeline.
    #[error("Intake pipeline is not running")]
    NotRunning,

    /// `start()` called twice.
    #[error("Intake pipeline already started")]
    AlreadyStarted,

    /// `start()` called after `stop()`.
    #[error("Intake pipeline was stopped and cannot be restarted")]
    Stopped,

    /// Failure in the wiring substrate.
    #[error("Wiring error: {0}")]
    Wiring(#[from] WiringError),

    /// Configuration rejected before the pipeline was built.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
