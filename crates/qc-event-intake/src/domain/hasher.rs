//! # Event Hasher
//!
//! SHA-384 over the hashed portion of an event. Every field is fed in a fixed
//! order with explicit lengths, so two different events cannot produce the
//! same byte stream.
//!
//! No failure path: malformed content is the internal validator's concern.

use sha2::{Digest, Sha384};
use shared_types::{EventDescriptor, EventHash, GossipEvent, HashedEventData, UnhashedEvent};

/// Stateless event hasher. Safe to run concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventHasher;

impl EventHasher {
    /// Create a hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute the content hash and attach it.
    #[must_use]
    pub fn hash_event(&self, event: UnhashedEvent) -> GossipEvent {
        let hash = hash_data(&event.hashed_data);
        event.into_hashed(hash)
    }
}

/// Content hash of the hashed portion of an event.
#[must_use]
pub fn hash_data(data: &HashedEventData) -> EventHash {
    let mut hasher = Sha384::new();
    hasher.update(data.creator.0.to_le_bytes());
    hasher.update(data.software_version.0.to_le_bytes());
    hasher.update(data.generation.to_le_bytes());
    hasher.update(data.birth_round.to_le_bytes());

    match &data.self_parent {
        Some(parent) => {
            hasher.update([1u8]);
            feed_descriptor(&mut hasher, parent);
        }
        None => hasher.update([0u8]),
    }
    hasher.update((data.other_parents.len() as u64).to_le_bytes());
    for parent in &data.other_parents {
        feed_descriptor(&mut hasher, parent);
    }

    hasher.update(data.time_created_nanos.to_le_bytes());
    hasher.update((data.transactions.len() as u64).to_le_bytes());
    for transaction in &data.transactions {
        hasher.update((transaction.len() as u64).to_le_bytes());
        hasher.update(transaction);
    }

    EventHash::new(hasher.finalize().to_vec())
}

fn feed_descriptor(hasher: &mut Sha384, parent: &EventDescriptor) {
    hasher.update(parent.creator.0.to_le_bytes());
    hasher.update(parent.generation.to_le_bytes());
    hasher.update(parent.birth_round.to_le_bytes());
    hasher.update((parent.hash.len() as u64).to_le_bytes());
    hasher.update(parent.hash.as_bytes());
}
