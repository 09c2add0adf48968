//! # Scheduler Configuration
//!
//! Compact string form used in configuration files and environment variables:
//!
//! ```text
//! <TYPE> [CAPACITY(<n>)] [FLUSHABLE] [SQUELCHABLE]
//! ```
//!
//! For example `SEQUENTIAL CAPACITY(500) FLUSHABLE`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::WiringError;

/// Concurrency policy of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskSchedulerType {
    /// Handlers run in parallel on the shared pool. No ordering.
    Concurrent,
    /// Handlers run one at a time, in order, on the shared pool.
    #[default]
    Sequential,
    /// Handlers run one at a time, in order, on a scheduler-owned thread.
    SequentialThread,
    /// Handlers run on the caller's thread, one caller at a time.
    Direct,
    /// Handlers run on the caller's thread with no serialization.
    DirectThreadsafe,
}

impl TaskSchedulerType {
    /// True for the two caller-thread types.
    #[must_use]
    pub fn is_direct(self) -> bool {
        matches!(self, Self::Direct | Self::DirectThreadsafe)
    }

    /// True for types that preserve input order.
    #[must_use]
    pub fn is_ordered(self) -> bool {
        !matches!(self, Self::Concurrent | Self::DirectThreadsafe)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Concurrent => "CONCURRENT",
            Self::Sequential => "SEQUENTIAL",
            Self::SequentialThread => "SEQUENTIAL_THREAD",
            Self::Direct => "DIRECT",
            Self::DirectThreadsafe => "DIRECT_THREADSAFE",
        }
    }
}

impl fmt::Display for TaskSchedulerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskSchedulerType {
    type Err = WiringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CONCURRENT" => Ok(Self::Concurrent),
            "SEQUENTIAL" => Ok(Self::Sequential),
            "SEQUENTIAL_THREAD" => Ok(Self::SequentialThread),
            "DIRECT" => Ok(Self::Direct),
            "DIRECT_THREADSAFE" => Ok(Self::DirectThreadsafe),
            other => Err(WiringError::InvalidConfiguration(format!(
                "unknown scheduler type {other:?}"
            ))),
        }
    }
}

/// Immutable per-scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskSchedulerConfig {
    /// Concurrency policy.
    pub scheduler_type: TaskSchedulerType,
    /// Bound on in-flight items. `None` means unbounded.
    pub unhandled_task_capacity: Option<usize>,
    /// Whether `flush()` is supported.
    pub flushing_enabled: bool,
    /// Whether squelching is supported.
    pub squelching_enabled: bool,
}

impl TaskSchedulerConfig {
    /// Unbounded, unflushable scheduler of the given type.
    #[must_use]
    pub fn new(scheduler_type: TaskSchedulerType) -> Self {
        Self {
            scheduler_type,
            ..Self::default()
        }
    }

    /// Set the in-flight bound.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.unhandled_task_capacity = Some(capacity);
        self
    }

    /// Enable flushing.
    #[must_use]
    pub fn flushable(mut self) -> Self {
        self.flushing_enabled = true;
        self
    }

    /// Enable squelching.
    #[must_use]
    pub fn squelchable(mut self) -> Self {
        self.squelching_enabled = true;
        self
    }
}

fn parse_capacity(token: &str) -> Option<Result<usize, WiringError>> {
    let upper = token.to_ascii_uppercase();
    let inner = upper.strip_prefix("CAPACITY(")?.strip_suffix(')')?.to_string();
    Some(inner.trim().parse::<usize>().map_err(|_| {
        WiringError::InvalidConfiguration(format!("bad capacity {token:?}"))
    }))
}

impl FromStr for TaskSchedulerConfig {
    type Err = WiringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let scheduler_type = tokens
            .next()
            .ok_or_else(|| WiringError::InvalidConfiguration("empty scheduler config".into()))?
            .parse::<TaskSchedulerType>()?;

        let mut config = Self::new(scheduler_type);
        for token in tokens {
            if let Some(capacity) = parse_capacity(token) {
                config.unhandled_task_capacity = Some(capacity?);
                continue;
            }
            match token.to_ascii_uppercase().as_str() {
                "FLUSHABLE" => config.flushing_enabled = true,
                "SQUELCHABLE" => config.squelching_enabled = true,
                _ => {
                    return Err(WiringError::InvalidConfiguration(format!(
                        "unknown scheduler option {token:?}"
                    )))
                }
            }
        }
        Ok(config)
    }
}

impl fmt::Display for TaskSchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scheduler_type)?;
        if let Some(capacity) = self.unhandled_task_capacity {
            write!(f, " CAPACITY({capacity})")?;
        }
        if self.flushing_enabled {
            f.write_str(" FLUSHABLE")?;
        }
        if self.squelching_enabled {
            f.write_str(" SQUELCHABLE")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for TaskSchedulerConfig {
    type Error = WiringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskSchedulerConfig> for String {
    fn from(config: TaskSchedulerConfig) -> Self {
        config.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config: TaskSchedulerConfig = "SEQUENTIAL CAPACITY(500) FLUSHABLE SQUELCHABLE"
            .parse()
            .unwrap();
        assert_eq!(config.scheduler_type, TaskSchedulerType::Sequential);
        assert_eq!(config.unhandled_task_capacity, Some(500));
        assert!(config.flushing_enabled);
        assert!(config.squelching_enabled);
    }

    #[test]
    fn test_parse_type_only() {
        let config: TaskSchedulerConfig = "direct_threadsafe".parse().unwrap();
        assert_eq!(config, TaskSchedulerConfig::new(TaskSchedulerType::DirectThreadsafe));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<TaskSchedulerConfig>().is_err());
        assert!("PARALLEL".parse::<TaskSchedulerConfig>().is_err());
        assert!("SEQUENTIAL CAPACITY(lots)".parse::<TaskSchedulerConfig>().is_err());
        assert!("SEQUENTIAL FAST".parse::<TaskSchedulerConfig>().is_err());
    }

    #[test]
    fn test_display_matches_input_form() {
        let config = TaskSchedulerConfig::new(TaskSchedulerType::SequentialThread)
            .with_capacity(10)
            .flushable();
        assert_eq!(config.to_string(), "SEQUENTIAL_THREAD CAPACITY(10) FLUSHABLE");
    }

    #[test]
    fn test_deserialize_from_string() {
        let config: TaskSchedulerConfig =
            serde_json::from_str("\"CONCURRENT CAPACITY(10000)\"").unwrap();
        assert_eq!(config.scheduler_type, TaskSchedulerType::Concurrent);
        assert_eq!(config.unhandled_task_capacity, Some(10000));
        assert!(serde_json::from_str::<TaskSchedulerConfig>("\"NOPE\"").is_err());
    }
}
