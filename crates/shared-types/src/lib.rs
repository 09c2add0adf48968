//! # Shared Types Crate
//!
//! This crate contains the hashgraph entities that flow through the event
//! intake pipeline and the collaborators around it.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Events, descriptors, event windows and
//!   address books are defined once here and used by every crate.
//! - **Move, don't alias**: A `GossipEvent` is owned by exactly one stage at a
//!   time. Fan-out to several consumers goes through `Clone` explicitly.
//! - **Hash after construction**: `UnhashedEvent` is what the network hands in;
//!   only the hasher turns it into a `GossipEvent` carrying its content hash.

pub mod address_book;
pub mod entities;
pub mod errors;
pub mod event_window;
pub mod sequence_map;

pub use address_book::{Address, AddressBook, AddressBookUpdate};
pub use entities::*;
pub use errors::EntityError;
pub use event_window::{AncientMode, EventWindow};
pub use sequence_map::SequenceMap;
