//! # Intake Configuration
//!
//! Environment-driven configuration for the intake pipeline. Every field has
//! a default; `from_env` overrides fields whose variable is set and fails on
//! values that do not parse.
//!
//! ## Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `QC_INTAKE_<STAGE>_SCHEDULER` | see [`IntakeSchedulersConfig::default`] |
//! | `QC_INTAKE_HASHING_CAPACITY` | 10000 |
//! | `QC_INTAKE_MAX_TRANSACTION_BYTES` | 245760 |
//! | `QC_INTAKE_SINGLE_NODE_NETWORK` | false |
//! | `QC_SOFTWARE_VERSION` | v1 |
//! | `QC_ANCIENT_MODE` | generation |
//! | `QC_INTAKE_WORKER_THREADS` | 0 (available parallelism) |
//! | `QC_INTAKE_HEARTBEAT_MS` | 1000 |
//! | `QC_INTAKE_UNPROCESSED_WARNING` | 5000 |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::{AncientMode, SoftwareVersion};
use shared_wiring::{TaskSchedulerConfig, TaskSchedulerType, WiringError};
use thiserror::Error;

use crate::domain::stage::IntakeStage;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A scheduler string did not parse.
    #[error("{var}: {source}")]
    InvalidScheduler {
        var: String,
        #[source]
        source: WiringError,
    },

    /// A scalar variable did not parse.
    #[error("{var}: cannot parse {value:?}")]
    InvalidValue { var: String, value: String },

    /// Parsed values that cannot work together.
    #[error("Invalid intake configuration: {0}")]
    Inconsistent(String),
}

// =============================================================================
// SCHEDULERS
// =============================================================================

/// Scheduler configuration for every intake stage and consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeSchedulersConfig {
    /// Capacity is ignored: the hasher shares `hashing_counter_capacity`
    /// with the post-hash collector.
    pub event_hasher: TaskSchedulerConfig,
    pub post_hash_collector: TaskSchedulerConfig,
    pub internal_event_validator: TaskSchedulerConfig,
    pub event_deduplicator: TaskSchedulerConfig,
    pub event_signature_validator: TaskSchedulerConfig,
    pub orphan_buffer: TaskSchedulerConfig,
    pub consensus_consumer: TaskSchedulerConfig,
    pub gossip_consumer: TaskSchedulerConfig,
    /// Events hashed or waiting in the collector.
    pub hashing_counter_capacity: usize,
}

impl Default for IntakeSchedulersConfig {
    fn default() -> Self {
        let stage = || {
            TaskSchedulerConfig::new(TaskSchedulerType::Sequential)
                .with_capacity(500)
                .flushable()
        };
        Self {
            event_hasher: TaskSchedulerConfig::new(TaskSchedulerType::Concurrent).flushable(),
            post_hash_collector: TaskSchedulerConfig::new(TaskSchedulerType::Sequential).flushable(),
            internal_event_validator: stage(),
            event_deduplicator: stage(),
            event_signature_validator: stage(),
            orphan_buffer: stage().squelchable(),
            consensus_consumer: TaskSchedulerConfig::new(TaskSchedulerType::SequentialThread)
                .with_capacity(500)
                .flushable(),
            gossip_consumer: TaskSchedulerConfig::new(TaskSchedulerType::Sequential).flushable(),
            hashing_counter_capacity: 10_000,
        }
    }
}

impl IntakeSchedulersConfig {
    /// Config for one pipeline stage.
    #[must_use]
    pub fn stage(&self, stage: IntakeStage) -> &TaskSchedulerConfig {
        match stage {
            IntakeStage::Hasher => &self.event_hasher,
            IntakeStage::PostHashCollector => &self.post_hash_collector,
            IntakeStage::InternalValidator => &self.internal_event_validator,
            IntakeStage::Deduplicator => &self.event_deduplicator,
            IntakeStage::SignatureValidator => &self.event_signature_validator,
            IntakeStage::OrphanBuffer => &self.orphan_buffer,
        }
    }

    fn stage_mut(&mut self, stage: IntakeStage) -> &mut TaskSchedulerConfig {
        match stage {
            IntakeStage::Hasher => &mut self.event_hasher,
            IntakeStage::PostHashCollector => &mut self.post_hash_collector,
            IntakeStage::InternalValidator => &mut self.internal_event_validator,
            IntakeStage::Deduplicator => &mut self.event_deduplicator,
            IntakeStage::SignatureValidator => &mut self.event_signature_validator,
            IntakeStage::OrphanBuffer => &mut self.orphan_buffer,
        }
    }

    /// Defaults overridden by `QC_INTAKE_<STAGE>_SCHEDULER` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for stage in IntakeStage::ALL {
            let var = format!("QC_INTAKE_{}_SCHEDULER", stage.as_str().to_ascii_uppercase());
            if let Some(parsed) = scheduler_from_env(&var)? {
                *config.stage_mut(stage) = parsed;
            }
        }
        if let Some(parsed) = scheduler_from_env("QC_INTAKE_CONSENSUS_CONSUMER_SCHEDULER")? {
            config.consensus_consumer = parsed;
        }
        if let Some(parsed) = scheduler_from_env("QC_INTAKE_GOSSIP_CONSUMER_SCHEDULER")? {
            config.gossip_consumer = parsed;
        }
        if let Some(capacity) = parse_env("QC_INTAKE_HASHING_CAPACITY")? {
            config.hashing_counter_capacity = capacity;
        }
        Ok(config)
    }

    /// The coordinator flushes every scheduler and squelches the orphan
    /// buffer; reject configurations that would make that fail at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hashing_counter_capacity == 0 {
            return Err(ConfigError::Inconsistent(
                "hashing counter capacity must be at least 1".into(),
            ));
        }
        let named = IntakeStage::ALL
            .iter()
            .map(|stage| (stage.as_str(), self.stage(*stage)))
            .chain([
                ("consensus_consumer", &self.consensus_consumer),
                ("gossip_consumer", &self.gossip_consumer),
            ]);
        for (name, config) in named {
            if !config.flushing_enabled {
                return Err(ConfigError::Inconsistent(format!("{name} must be FLUSHABLE")));
            }
        }
        if !self.orphan_buffer.squelching_enabled {
            return Err(ConfigError::Inconsistent(
                "orphan_buffer must be SQUELCHABLE".into(),
            ));
        }
        if !self.post_hash_collector.scheduler_type.is_ordered() {
            return Err(ConfigError::Inconsistent(
                "post_hash_collector must preserve order".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// INTAKE
// =============================================================================

/// Complete intake configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub schedulers: IntakeSchedulersConfig,
    /// Upper bound on the summed size of an event's transactions.
    pub max_transaction_bytes_per_event: usize,
    /// Permits an event whose two parents are the same event.
    pub single_node_network: bool,
    /// Version of the software this node runs.
    pub software_version: SoftwareVersion,
    pub ancient_mode: AncientMode,
    /// Shared pool size (0 = available parallelism).
    pub worker_threads: usize,
    /// Period of the health monitor heartbeat.
    pub heartbeat_period: Duration,
    /// Unprocessed count above which the health monitor warns.
    pub unprocessed_warning_threshold: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            schedulers: IntakeSchedulersConfig::default(),
            max_transaction_bytes_per_event: 245_760,
            single_node_network: false,
            software_version: SoftwareVersion(1),
            ancient_mode: AncientMode::GenerationThreshold,
            worker_threads: 0,
            heartbeat_period: Duration::from_secs(1),
            unprocessed_warning_threshold: 5_000,
        }
    }
}

impl IntakeConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            schedulers: IntakeSchedulersConfig::from_env()?,
            max_transaction_bytes_per_event: parse_env("QC_INTAKE_MAX_TRANSACTION_BYTES")?
                .unwrap_or(defaults.max_transaction_bytes_per_event),
            single_node_network: env::var("QC_INTAKE_SINGLE_NODE_NETWORK")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.single_node_network),
            software_version: parse_env("QC_SOFTWARE_VERSION")?
                .unwrap_or(defaults.software_version),
            ancient_mode: match env::var("QC_ANCIENT_MODE") {
                Ok(value) => parse_ancient_mode(&value)?,
                Err(_) => defaults.ancient_mode,
            },
            worker_threads: parse_env("QC_INTAKE_WORKER_THREADS")?
                .unwrap_or(defaults.worker_threads),
            heartbeat_period: parse_env("QC_INTAKE_HEARTBEAT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.heartbeat_period),
            unprocessed_warning_threshold: parse_env("QC_INTAKE_UNPROCESSED_WARNING")?
                .unwrap_or(defaults.unprocessed_warning_threshold),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedulers.validate()?;
        if self.heartbeat_period.is_zero() {
            return Err(ConfigError::Inconsistent(
                "heartbeat period must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn scheduler_from_env(var: &str) -> Result<Option<TaskSchedulerConfig>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|source| ConfigError::InvalidScheduler {
                var: var.to_string(),
                source,
            }),
        Err(_) => Ok(None),
    }
}

fn parse_env<T: FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn parse_ancient_mode(value: &str) -> Result<AncientMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "generation" | "generation_threshold" => Ok(AncientMode::GenerationThreshold),
        "birth_round" | "birth_round_threshold" => Ok(AncientMode::BirthRoundThreshold),
        _ => Err(ConfigError::InvalidValue {
            var: "QC_ANCIENT_MODE".to_string(),
            value: value.to_string(),
        }),
    }
}
