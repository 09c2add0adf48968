//! # Node Configuration
//!
//! Unified configuration for the intake pipeline, telemetry and the
//! starting address book.
//!
//! ## Address Book Format
//!
//! `QC_ADDRESS_BOOK` is a comma-separated list of `id:weight[:hex_key]`
//! entries, where `hex_key` is a 32-byte Ed25519 public key:
//!
//! ```text
//! QC_ADDRESS_BOOK="0:10:3b6a27bc...,1:10:8a88e3dd...,2:5"
//! ```
//!
//! An entry without a key belongs to a node that has not published one; its
//! events are dropped by the signature validator.

use std::env;

use qc_event_intake::IntakeConfig;
use quantum_telemetry::TelemetryConfig;
use shared_types::{Address, AddressBook, NodeId};
use thiserror::Error;
use tracing::warn;

/// Ed25519 public key length in bytes.
const PUBLIC_KEY_LEN: usize = 32;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("intake configuration: {0}")]
    Intake(#[from] qc_event_intake::ConfigError),

    #[error("invalid address book entry '{entry}': {reason}")]
    InvalidAddressBookEntry { entry: String, reason: String },

    #[error("invalid telemetry configuration: {0}")]
    Telemetry(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Intake pipeline configuration.
    pub intake: IntakeConfig,
    /// Logging, tracing and metrics configuration.
    pub telemetry: TelemetryConfig,
    /// Address book in effect for the configured software version.
    pub address_book: AddressBook,
}

impl NodeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let address_book = match env::var("QC_ADDRESS_BOOK") {
            Ok(value) => parse_address_book(&value)?,
            Err(_) => AddressBook::new(),
        };
        let config = Self {
            intake: IntakeConfig::from_env()?,
            telemetry: TelemetryConfig::from_env(),
            address_book,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the combined configuration.
    ///
    /// An empty address book is allowed but every event will be dropped
    /// until an address book update arrives.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.intake.validate()?;
        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::Telemetry("service name must not be empty".into()));
        }
        if self.address_book.is_empty() {
            warn!("Address book is empty; all events will be dropped until one is provided");
        }
        Ok(())
    }
}

/// Parse the `QC_ADDRESS_BOOK` format.
pub fn parse_address_book(value: &str) -> Result<AddressBook, ConfigError> {
    let mut book = AddressBook::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let address = parse_address(entry)?;
        book.insert(address).map_err(|e| ConfigError::InvalidAddressBookEntry {
            entry: entry.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(book)
}

fn parse_address(entry: &str) -> Result<Address, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidAddressBookEntry {
        entry: entry.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = entry.split(':').map(str::trim);
    let node_id = parts
        .next()
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| invalid("node id must be an unsigned integer"))?;
    let weight = parts
        .next()
        .and_then(|w| w.parse().ok())
        .ok_or_else(|| invalid("weight must be an unsigned integer"))?;
    let signing_key = match parts.next() {
        Some(key_hex) => {
            let key = hex::decode(key_hex).map_err(|_| invalid("key is not valid hex"))?;
            if key.len() != PUBLIC_KEY_LEN {
                return Err(invalid("key must be 32 bytes (64 hex chars)"));
            }
            Some(key)
        }
        None => None,
    };
    if parts.next().is_some() {
        return Err(invalid("expected id:weight[:key]"));
    }

    Ok(Address {
        node_id: NodeId(node_id),
        weight,
        signing_key,
    })
}
