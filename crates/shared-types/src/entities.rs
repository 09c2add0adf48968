//! # Core Domain Entities
//!
//! Defines the hashgraph entities that the intake pipeline inspects.
//!
//! ## Clusters
//!
//! - **Identity**: `NodeId`, `SoftwareVersion`
//! - **Hashing**: `EventHash`, `EventDescriptor`
//! - **Events**: `HashedEventData`, `UnhashedEvent`, `GossipEvent`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EntityError;
use crate::event_window::AncientMode;

/// Length in bytes of an event hash (SHA-384).
pub const EVENT_HASH_LEN: usize = 48;

/// Length in bytes of an event signature (Ed25519).
pub const SIGNATURE_LEN: usize = 64;

/// Generation assigned to an event that has no parents.
pub const FIRST_GENERATION: u64 = 0;

/// An event has at most a self-parent and one other-parent.
pub const MAX_PARENT_COUNT: usize = 2;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Unique identifier for a node in the network.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of the node software that created an event.
///
/// Selects which address book verifies the event's signature.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct SoftwareVersion(pub u32);

impl fmt::Display for SoftwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for SoftwareVersion {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        trimmed
            .parse::<u32>()
            .map(SoftwareVersion)
            .map_err(|_| EntityError::InvalidSoftwareVersion(s.to_string()))
    }
}

// =============================================================================
// CLUSTER B: HASHING
// =============================================================================

/// Content hash of an event.
///
/// Stored as raw bytes because hashes of parents arrive from the network and
/// may be malformed; the internal validator checks the length.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EventHash(Vec<u8>);

impl EventHash {
    /// Wrap raw hash bytes without checking their length.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw hash bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the hash.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the hash holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the hash is non-empty and exactly `EVENT_HASH_LEN` bytes long.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == EVENT_HASH_LEN
    }

    /// Hex of the first six bytes, for log lines.
    #[must_use]
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(6)])
    }
}

impl From<[u8; EVENT_HASH_LEN]> for EventHash {
    fn from(bytes: [u8; EVENT_HASH_LEN]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({})", self.short_hex())
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_hex())
    }
}

/// Identifies an event without carrying its payload.
///
/// Equality and hashing consider only `(creator, hash)`; generation and birth
/// round ride along so that ancient-ness can be decided from a parent
/// reference alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Content hash of the event.
    pub hash: EventHash,
    /// Node that created the event.
    pub creator: NodeId,
    /// Generation of the event.
    pub generation: u64,
    /// Round in which the event was created.
    pub birth_round: u64,
}

impl EventDescriptor {
    /// Create a descriptor.
    #[must_use]
    pub fn new(hash: EventHash, creator: NodeId, generation: u64, birth_round: u64) -> Self {
        Self {
            hash,
            creator,
            generation,
            birth_round,
        }
    }

    /// The value compared against an event window's ancient threshold.
    #[must_use]
    pub fn ancient_indicator(&self, mode: AncientMode) -> u64 {
        match mode {
            AncientMode::GenerationThreshold => self.generation,
            AncientMode::BirthRoundThreshold => self.birth_round,
        }
    }
}

impl PartialEq for EventDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.creator == other.creator && self.hash == other.hash
    }
}

impl Eq for EventDescriptor {}

impl std::hash::Hash for EventDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.creator.hash(state);
        self.hash.hash(state);
    }
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(creator:{} gen:{} round:{} hash:{})",
            self.creator, self.generation, self.birth_round, self.hash
        )
    }
}

// =============================================================================
// CLUSTER C: EVENTS
// =============================================================================

/// The part of an event covered by its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HashedEventData {
    /// Node that created the event.
    pub creator: NodeId,
    /// Software version of the creator.
    pub software_version: SoftwareVersion,
    /// Generation: one more than the highest parent generation.
    pub generation: u64,
    /// Round in which the event was created.
    pub birth_round: u64,
    /// The creator's previous event, if any.
    pub self_parent: Option<EventDescriptor>,
    /// Events by other creators that this event references.
    pub other_parents: Vec<EventDescriptor>,
    /// Creation time, nanoseconds since the Unix epoch.
    pub time_created_nanos: u64,
    /// Application transactions carried by the event.
    pub transactions: Vec<Vec<u8>>,
}

impl HashedEventData {
    /// Iterate all parents, self-parent first.
    pub fn parents(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.self_parent.iter().chain(self.other_parents.iter())
    }

    /// Number of declared parents.
    #[must_use]
    pub fn parent_count(&self) -> usize {
        usize::from(self.self_parent.is_some()) + self.other_parents.len()
    }

    /// Total size of all transaction payloads.
    #[must_use]
    pub fn transaction_bytes(&self) -> usize {
        self.transactions.iter().map(Vec::len).sum()
    }
}

/// How far an event has progressed through intake validation.
///
/// Pipeline-local bookkeeping; never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum IntakeStatus {
    /// Hashed, nothing checked yet.
    #[default]
    Received,
    /// Passed the internal (structural) validator.
    StructurallyValid,
    /// Signature verified against the applicable address book.
    SignatureVerified,
}

/// An event as received from gossip, before its hash is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnhashedEvent {
    /// The hashed portion of the event.
    pub hashed_data: HashedEventData,
    /// Creator's signature over the content hash.
    pub signature: Vec<u8>,
    /// Peer that delivered the event, if it came from gossip.
    pub sender_id: Option<NodeId>,
}

impl UnhashedEvent {
    /// Create an event without a sender.
    #[must_use]
    pub fn new(hashed_data: HashedEventData, signature: Vec<u8>) -> Self {
        Self {
            hashed_data,
            signature,
            sender_id: None,
        }
    }

    /// Attach the peer that delivered this event.
    #[must_use]
    pub fn with_sender(mut self, sender: NodeId) -> Self {
        self.sender_id = Some(sender);
        self
    }

    /// Attach the computed content hash. Consumes the unhashed event.
    #[must_use]
    pub fn into_hashed(self, hash: EventHash) -> GossipEvent {
        GossipEvent::new(self.hashed_data, self.signature, hash, self.sender_id)
    }
}

/// A hashed event travelling through the intake pipeline.
///
/// The hash is fixed at construction; there is no way to replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipEvent {
    hashed_data: HashedEventData,
    signature: Vec<u8>,
    hash: EventHash,
    sender_id: Option<NodeId>,
    #[serde(skip)]
    status: IntakeStatus,
}

impl GossipEvent {
    /// Create a hashed event.
    ///
    /// Used by the hasher and by replay paths that already know the hash.
    #[must_use]
    pub fn new(
        hashed_data: HashedEventData,
        signature: Vec<u8>,
        hash: EventHash,
        sender_id: Option<NodeId>,
    ) -> Self {
        Self {
            hashed_data,
            signature,
            hash,
            sender_id,
            status: IntakeStatus::Received,
        }
    }

    /// The hashed portion of the event.
    #[must_use]
    pub fn hashed_data(&self) -> &HashedEventData {
        &self.hashed_data
    }

    /// The content hash.
    #[must_use]
    pub fn hash(&self) -> &EventHash {
        &self.hash
    }

    /// The creator's signature over the content hash.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Node that created the event.
    #[must_use]
    pub fn creator(&self) -> NodeId {
        self.hashed_data.creator
    }

    /// Generation of the event.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.hashed_data.generation
    }

    /// Birth round of the event.
    #[must_use]
    pub fn birth_round(&self) -> u64 {
        self.hashed_data.birth_round
    }

    /// Software version of the creator.
    #[must_use]
    pub fn software_version(&self) -> SoftwareVersion {
        self.hashed_data.software_version
    }

    /// Peer that delivered the event, if any.
    #[must_use]
    pub fn sender_id(&self) -> Option<NodeId> {
        self.sender_id
    }

    /// Iterate all parents, self-parent first.
    pub fn parents(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.hashed_data.parents()
    }

    /// Descriptor identifying this event.
    #[must_use]
    pub fn descriptor(&self) -> EventDescriptor {
        EventDescriptor::new(
            self.hash.clone(),
            self.hashed_data.creator,
            self.hashed_data.generation,
            self.hashed_data.birth_round,
        )
    }

    /// The value compared against an event window's ancient threshold.
    #[must_use]
    pub fn ancient_indicator(&self, mode: AncientMode) -> u64 {
        match mode {
            AncientMode::GenerationThreshold => self.hashed_data.generation,
            AncientMode::BirthRoundThreshold => self.hashed_data.birth_round,
        }
    }

    /// How far this event has progressed through validation.
    #[must_use]
    pub fn status(&self) -> IntakeStatus {
        self.status
    }

    /// Record validation progress. Status never moves backward.
    pub fn advance_status(&mut self, status: IntakeStatus) {
        if status > self.status {
            self.status = status;
        }
    }
}

/// Strip the hash for re-gossip. Receivers recompute it.
impl From<GossipEvent> for UnhashedEvent {
    fn from(event: GossipEvent) -> Self {
        Self {
            hashed_data: event.hashed_data,
            signature: event.signature,
            sender_id: event.sender_id,
        }
    }
}

impl fmt::Display for GossipEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(creator:{} gen:{} round:{} hash:{} parents:{})",
            self.hashed_data.creator,
            self.hashed_data.generation,
            self.hashed_data.birth_round,
            self.hash,
            self.hashed_data.parent_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn hash(byte: u8) -> EventHash {
        EventHash::from([byte; EVENT_HASH_LEN])
    }

    #[test]
    fn test_descriptor_identity_ignores_generation() {
        let a = EventDescriptor::new(hash(1), NodeId(3), 5, 1);
        let b = EventDescriptor::new(hash(1), NodeId(3), 9, 2);
        let c = EventDescriptor::new(hash(1), NodeId(4), 5, 1);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_hash_well_formed() {
        assert!(hash(7).is_well_formed());
        assert!(!EventHash::new(vec![1, 2, 3]).is_well_formed());
        assert!(!EventHash::default().is_well_formed());
        assert!(EventHash::default().is_empty());
    }

    #[test]
    fn test_parents_self_parent_first() {
        let data = HashedEventData {
            self_parent: Some(EventDescriptor::new(hash(1), NodeId(0), 0, 0)),
            other_parents: vec![EventDescriptor::new(hash(2), NodeId(1), 0, 0)],
            ..Default::default()
        };
        let creators: Vec<_> = data.parents().map(|p| p.creator).collect();
        assert_eq!(creators, vec![NodeId(0), NodeId(1)]);
        assert_eq!(data.parent_count(), 2);
    }

    #[test]
    fn test_into_hashed_keeps_sender() {
        let event = UnhashedEvent::new(HashedEventData::default(), vec![0; SIGNATURE_LEN])
            .with_sender(NodeId(9))
            .into_hashed(hash(4));
        assert_eq!(event.sender_id(), Some(NodeId(9)));
        assert_eq!(event.hash(), &hash(4));
        assert_eq!(event.status(), IntakeStatus::Received);
    }

    #[test]
    fn test_status_never_moves_backward() {
        let mut event = GossipEvent::new(HashedEventData::default(), vec![], hash(1), None);
        event.advance_status(IntakeStatus::SignatureVerified);
        event.advance_status(IntakeStatus::StructurallyValid);
        assert_eq!(event.status(), IntakeStatus::SignatureVerified);
    }

    #[test]
    fn test_software_version_parse() {
        assert_eq!("v3".parse::<SoftwareVersion>().unwrap(), SoftwareVersion(3));
        assert_eq!("12".parse::<SoftwareVersion>().unwrap(), SoftwareVersion(12));
        assert!("beta".parse::<SoftwareVersion>().is_err());
    }

    #[test]
    fn test_status_not_serialized() {
        let mut event = GossipEvent::new(HashedEventData::default(), vec![1], hash(2), None);
        event.advance_status(IntakeStatus::SignatureVerified);
        let json = serde_json::to_string(&event).unwrap();
        let back: GossipEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status(), IntakeStatus::Received);
        assert_eq!(back.hash(), event.hash());
    }
}
