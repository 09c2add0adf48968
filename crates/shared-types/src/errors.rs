//! # Error Types
//!
//! Errors raised when constructing shared entities.

use thiserror::Error;

use crate::entities::NodeId;

/// Errors that can occur when building shared entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// A node appears twice in one address book.
    #[error("Duplicate address book entry for node {0}")]
    DuplicateAddress(NodeId),

    /// Address book entry has zero weight.
    #[error("Address book entry for node {0} has zero weight")]
    ZeroWeight(NodeId),

    /// Software version string could not be parsed.
    #[error("Invalid software version: {0:?}")]
    InvalidSoftwareVersion(String),
}
