//! # Event Window
//!
//! The consensus-derived boundary below which events are ancient.

use serde::{Deserialize, Serialize};

/// Which event attribute is compared against the ancient threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AncientMode {
    /// Compare the event's generation.
    #[default]
    GenerationThreshold,
    /// Compare the event's birth round.
    BirthRoundThreshold,
}

/// Snapshot of consensus progress broadcast to intake stages.
///
/// An event whose ancient indicator is strictly below `ancient_threshold` is
/// ancient and may be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    /// Most recent round to reach consensus.
    pub latest_consensus_round: u64,
    /// Events below this indicator are ancient.
    pub ancient_threshold: u64,
    /// Attribute the threshold applies to.
    pub ancient_mode: AncientMode,
}

impl EventWindow {
    /// Create a window.
    #[must_use]
    pub fn new(latest_consensus_round: u64, ancient_threshold: u64, mode: AncientMode) -> Self {
        Self {
            latest_consensus_round,
            ancient_threshold,
            ancient_mode: mode,
        }
    }

    /// Window before any round has reached consensus. Nothing is ancient.
    #[must_use]
    pub fn genesis(mode: AncientMode) -> Self {
        Self::new(0, 0, mode)
    }

    /// True if an event with the given indicator is ancient in this window.
    #[must_use]
    pub fn is_ancient(&self, ancient_indicator: u64) -> bool {
        ancient_indicator < self.ancient_threshold
    }

    /// True if `other` does not move the window backward.
    #[must_use]
    pub fn is_advance_of(&self, other: &EventWindow) -> bool {
        self.ancient_threshold >= other.ancient_threshold
            && self.latest_consensus_round >= other.latest_consensus_round
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::genesis(AncientMode::default())
    }
}
