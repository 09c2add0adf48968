//! # Address Book
//!
//! Node roster with signing keys, keyed by `NodeId`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{NodeId, SoftwareVersion};
use crate::errors::EntityError;

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Node this entry describes.
    pub node_id: NodeId,
    /// Consensus weight.
    pub weight: u64,
    /// Public signing key bytes. `None` if the node has not published one.
    pub signing_key: Option<Vec<u8>>,
}

/// The set of nodes allowed to create events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressBook {
    entries: BTreeMap<NodeId, Address>,
}

impl AddressBook {
    /// Empty address book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of entries, rejecting duplicates and zero weights.
    pub fn from_addresses(
        addresses: impl IntoIterator<Item = Address>,
    ) -> Result<Self, EntityError> {
        let mut book = Self::new();
        for address in addresses {
            book.insert(address)?;
        }
        Ok(book)
    }

    /// Add one entry.
    pub fn insert(&mut self, address: Address) -> Result<(), EntityError> {
        if address.weight == 0 {
            return Err(EntityError::ZeroWeight(address.node_id));
        }
        if self.entries.contains_key(&address.node_id) {
            return Err(EntityError::DuplicateAddress(address.node_id));
        }
        self.entries.insert(address.node_id, address);
        Ok(())
    }

    /// Look up a node.
    #[must_use]
    pub fn get(&self, node_id: NodeId) -> Option<&Address> {
        self.entries.get(&node_id)
    }

    /// True if the node is in the book.
    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.entries.contains_key(&node_id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the book has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.entries.values().map(|a| a.weight).sum()
    }

    /// Iterate entries in node-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.entries.values()
    }
}

/// Roster change delivered to the signature validator.
///
/// `previous` is the book that verifies events from older software versions;
/// `current` verifies everything at or above `software_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookUpdate {
    /// Version at which `current` takes effect.
    pub software_version: SoftwareVersion,
    /// Book for events older than `software_version`.
    pub previous: Option<AddressBook>,
    /// Book for events at or above `software_version`.
    pub current: AddressBook,
}
