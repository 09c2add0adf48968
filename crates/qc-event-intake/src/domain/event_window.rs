//! Per-stage view of the event window. Never moves backward.

use shared_types::{AncientMode, EventDescriptor, EventWindow};
use tracing::{trace, warn};

use crate::domain::stage::IntakeStage;

/// Sequence-number extractor matching an ancient mode.
#[must_use]
pub fn descriptor_sequence(mode: AncientMode) -> fn(&EventDescriptor) -> u64 {
    match mode {
        AncientMode::GenerationThreshold => |d: &EventDescriptor| d.generation,
        AncientMode::BirthRoundThreshold => |d: &EventDescriptor| d.birth_round,
    }
}

/// The window as last applied by one stage.
#[derive(Debug, Clone)]
pub struct EventWindowTracker {
    stage: IntakeStage,
    current: EventWindow,
}

impl EventWindowTracker {
    /// Start at the genesis window.
    #[must_use]
    pub fn new(stage: IntakeStage, mode: AncientMode) -> Self {
        Self {
            stage,
            current: EventWindow::genesis(mode),
        }
    }

    /// The window currently applied.
    #[must_use]
    pub fn current(&self) -> EventWindow {
        self.current
    }

    /// Ancient mode of this stage.
    #[must_use]
    pub fn ancient_mode(&self) -> AncientMode {
        self.current.ancient_mode
    }

    /// True if an event with this indicator is ancient.
    #[must_use]
    pub fn is_ancient(&self, ancient_indicator: u64) -> bool {
        self.current.is_ancient(ancient_indicator)
    }

    /// Apply `window` if it does not move backward. Returns true if applied.
    pub fn advance(&mut self, window: EventWindow) -> bool {
        if window.ancient_mode != self.current.ancient_mode {
            warn!(stage = %self.stage, mode = ?window.ancient_mode, "Event window with wrong ancient mode ignored");
            return false;
        }
        if !window.is_advance_of(&self.current) {
            warn!(
                stage = %self.stage,
                current = self.current.ancient_threshold,
                proposed = window.ancient_threshold,
                "Event window moving backward ignored"
            );
            return false;
        }
        trace!(stage = %self.stage, threshold = window.ancient_threshold, "Event window applied");
        self.current = window;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic() {
        let mut tracker = EventWindowTracker::new(IntakeStage::Deduplicator, AncientMode::GenerationThreshold);
        assert!(tracker.advance(EventWindow::new(3, 10, AncientMode::GenerationThreshold)));
        assert!(!tracker.advance(EventWindow::new(2, 8, AncientMode::GenerationThreshold)));
        assert_eq!(tracker.current().ancient_threshold, 10);
        assert!(tracker.is_ancient(9));
    }

    #[test]
    fn test_rejects_mode_change() {
        let mut tracker = EventWindowTracker::new(IntakeStage::OrphanBuffer, AncientMode::GenerationThreshold);
        assert!(!tracker.advance(EventWindow::new(3, 10, AncientMode::BirthRoundThreshold)));
    }

    #[test]
    fn test_sequence_matches_mode() {
        let descriptor = EventDescriptor::new(Default::default(), Default::default(), 7, 2);
        assert_eq!(descriptor_sequence(AncientMode::GenerationThreshold)(&descriptor), 7);
        assert_eq!(descriptor_sequence(AncientMode::BirthRoundThreshold)(&descriptor), 2);
    }
}
