//! # Event Deduplicator
//!
//! Forwards an event only the first time its `(creator, hash)` descriptor is
//! seen. Seen descriptors are kept in a window-bounded map together with the
//! signatures they arrived with, so a repeat with a different signature can be
//! told apart from plain gossip redundancy.

use std::collections::HashSet;
use std::sync::Arc;

use shared_types::{AncientMode, EventDescriptor, EventWindow, GossipEvent, SequenceMap};
use tracing::{debug, trace};

use crate::domain::event_window::{descriptor_sequence, EventWindowTracker};
use crate::domain::intake_counter::IntakeEventCounter;
use crate::domain::stage::IntakeStage;
use crate::ports::outbound::IntakeMetrics;

/// Window-bounded duplicate filter.
pub struct EventDeduplicator {
    window: EventWindowTracker,
    observed: SequenceMap<EventDescriptor, HashSet<Vec<u8>>>,
    intake_counter: Arc<IntakeEventCounter>,
    metrics: Arc<dyn IntakeMetrics>,
}

impl EventDeduplicator {
    pub fn new(
        mode: AncientMode,
        intake_counter: Arc<IntakeEventCounter>,
        metrics: Arc<dyn IntakeMetrics>,
    ) -> Self {
        Self {
            window: EventWindowTracker::new(IntakeStage::Deduplicator, mode),
            observed: SequenceMap::new(descriptor_sequence(mode)),
            intake_counter,
            metrics,
        }
    }

    /// Forward novel events. Drops ancient events and duplicates.
    ///
    /// Check and insert happen under one `&mut self`, so concurrent copies of
    /// one event resolve to exactly one winner.
    pub fn handle_event(&mut self, event: GossipEvent) -> Option<GossipEvent> {
        if self.window.is_ancient(event.ancient_indicator(self.window.ancient_mode())) {
            trace!(event = %event, "Ancient event dropped by deduplicator");
            self.drop_event(&event, "ancient");
            return None;
        }

        let descriptor = event.descriptor();
        let Some(signatures) = self.observed.get_or_insert_with(descriptor, HashSet::new) else {
            self.drop_event(&event, "ancient");
            return None;
        };

        let first_sighting = signatures.is_empty();
        let new_signature = signatures.insert(event.signature().to_vec());
        if first_sighting {
            return Some(event);
        }

        if new_signature {
            debug!(event = %event, sender = ?event.sender_id(), "Duplicate event with disparate signature");
            self.metrics.record_disparate_signature();
            self.drop_event(&event, "disparate_signature");
        } else {
            trace!(event = %event, "Duplicate event dropped");
            self.metrics.record_duplicate();
            self.drop_event(&event, "duplicate");
        }
        None
    }

    /// Advance the window and evict descriptors that became ancient.
    pub fn set_event_window(&mut self, window: EventWindow) {
        if self.window.advance(window) {
            self.observed.shift_window(window.ancient_threshold, |_, _| {});
        }
    }

    /// Forget every descriptor seen so far.
    pub fn clear(&mut self) {
        self.observed.clear();
        self.observed
            .shift_window(self.window.current().ancient_threshold, |_, _| {});
        debug!("Deduplicator cleared");
    }

    /// Number of descriptors tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    /// True if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    fn drop_event(&self, event: &GossipEvent, reason: &'static str) {
        self.metrics.record_dropped(IntakeStage::Deduplicator, reason);
        self.intake_counter
            .event_exited_intake_pipeline(event.sender_id());
    }
}
