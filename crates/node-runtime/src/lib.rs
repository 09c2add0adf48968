//! # Node Runtime Library
//!
//! Composition root for the hashgraph intake node. The `main.rs` binary uses
//! these modules; they are exposed for testing.
//!
//! - `container/`: node configuration and the assembled intake service
//! - `adapters/`: Prometheus metrics sink, logging gateways, `/metrics` endpoint

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod container;

pub use container::{ConfigError, IntakeContainer, NodeConfig};
