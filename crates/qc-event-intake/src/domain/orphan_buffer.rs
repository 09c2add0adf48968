//! # Orphan Buffer
//!
//! Holds events until every parent has been released or has become ancient,
//! then releases them parent-before-child.
//!
//! ## State
//!
//! - `released`: descriptors already handed downstream, bounded by the window.
//! - `missing_parents`: missing parent -> children waiting on it, bounded by
//!   the window. Shifting the window hands back every parent that became
//!   ancient so its children can be reconsidered.
//! - `orphans`: pending events with the set of parents each still waits on.
//!
//! Releases run off an explicit stack, so long chains of orphans never
//! recurse.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shared_types::{AncientMode, EventDescriptor, EventWindow, GossipEvent, SequenceMap};
use tracing::{debug, info, trace};

use crate::domain::event_window::{descriptor_sequence, EventWindowTracker};
use crate::domain::intake_counter::IntakeEventCounter;
use crate::domain::stage::IntakeStage;
use crate::ports::outbound::IntakeMetrics;

/// A buffered event and the parents it is still waiting for.
#[derive(Debug)]
struct OrphanedEvent {
    event: GossipEvent,
    missing: HashSet<EventDescriptor>,
}

/// Parent-before-child release buffer.
pub struct OrphanBuffer {
    window: EventWindowTracker,
    released: SequenceMap<EventDescriptor, ()>,
    missing_parents: SequenceMap<EventDescriptor, Vec<EventDescriptor>>,
    orphans: HashMap<EventDescriptor, OrphanedEvent>,
    intake_counter: Arc<IntakeEventCounter>,
    metrics: Arc<dyn IntakeMetrics>,
}

impl OrphanBuffer {
    pub fn new(
        mode: AncientMode,
        intake_counter: Arc<IntakeEventCounter>,
        metrics: Arc<dyn IntakeMetrics>,
    ) -> Self {
        Self {
            window: EventWindowTracker::new(IntakeStage::OrphanBuffer, mode),
            released: SequenceMap::new(descriptor_sequence(mode)),
            missing_parents: SequenceMap::new(descriptor_sequence(mode)),
            orphans: HashMap::new(),
            intake_counter,
            metrics,
        }
    }

    /// Accept a signature-verified event. Returns the events released as a
    /// result, in topological order; empty if the event became an orphan.
    pub fn handle_event(&mut self, event: GossipEvent) -> Vec<GossipEvent> {
        let mode = self.window.ancient_mode();
        if self.window.is_ancient(event.ancient_indicator(mode)) {
            trace!(event = %event, "Ancient event dropped by orphan buffer");
            self.drop_event(&event, "ancient");
            return Vec::new();
        }

        let descriptor = event.descriptor();
        if self.released.contains_key(&descriptor) || self.orphans.contains_key(&descriptor) {
            debug!(event = %event, "Event already known to orphan buffer");
            self.drop_event(&event, "duplicate");
            return Vec::new();
        }

        let missing: HashSet<EventDescriptor> = event
            .parents()
            .filter(|parent| self.is_missing(parent))
            .cloned()
            .collect();

        let released = if missing.is_empty() {
            self.release(event)
        } else {
            trace!(event = %event, missing = missing.len(), "Event buffered as orphan");
            for parent in &missing {
                if let Some(children) = self.missing_parents.get_or_insert_with(parent.clone(), Vec::new) {
                    children.push(descriptor.clone());
                }
            }
            self.orphans.insert(descriptor, OrphanedEvent { event, missing });
            Vec::new()
        };

        self.report_size();
        released
    }

    /// Advance the window. Parents that became ancient count as satisfied, so
    /// their orphans may be released. Pending events that are themselves
    /// ancient are dropped.
    pub fn set_event_window(&mut self, window: EventWindow) -> Vec<GossipEvent> {
        if !self.window.advance(window) {
            return Vec::new();
        }
        let threshold = window.ancient_threshold;

        self.released.shift_window(threshold, |_, _| {});

        let mut ancient_parents = Vec::new();
        self.missing_parents
            .shift_window(threshold, |parent, children| ancient_parents.push((parent, children)));

        let mut released = Vec::new();
        for (parent, children) in ancient_parents {
            for child in children {
                if let Some(ready) = self.resolve_parent(&child, &parent) {
                    released.extend(self.release(ready));
                }
            }
        }

        self.evict_stale_orphans();
        self.report_size();
        released
    }

    /// Drop all pending and released state. The window is kept.
    pub fn clear(&mut self) {
        let pending = self.orphans.len();
        for (_, orphan) in self.orphans.drain() {
            self.intake_counter
                .event_exited_intake_pipeline(orphan.event.sender_id());
        }
        self.released.clear();
        self.missing_parents.clear();
        let threshold = self.window.current().ancient_threshold;
        self.released.shift_window(threshold, |_, _| {});
        self.missing_parents.shift_window(threshold, |_, _| {});
        info!(pending, "Orphan buffer cleared");
        self.report_size();
    }

    /// Number of buffered orphans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }

    /// The window currently applied.
    #[must_use]
    pub fn event_window(&self) -> EventWindow {
        self.window.current()
    }

    fn is_missing(&self, parent: &EventDescriptor) -> bool {
        let ancient = self
            .window
            .is_ancient(parent.ancient_indicator(self.window.ancient_mode()));
        !ancient && !self.released.contains_key(parent)
    }

    /// Mark `parent` satisfied for `child`. Returns the child's event if that
    /// was its last missing parent.
    fn resolve_parent(
        &mut self,
        child: &EventDescriptor,
        parent: &EventDescriptor,
    ) -> Option<GossipEvent> {
        let orphan = self.orphans.get_mut(child)?;
        orphan.missing.remove(parent);
        if orphan.missing.is_empty() {
            self.orphans.remove(child).map(|orphan| orphan.event)
        } else {
            None
        }
    }

    fn release(&mut self, event: GossipEvent) -> Vec<GossipEvent> {
        let mode = self.window.ancient_mode();
        let mut released = Vec::new();
        let mut stack = vec![event];

        while let Some(event) = stack.pop() {
            if self.window.is_ancient(event.ancient_indicator(mode)) {
                trace!(event = %event, "Ancient event dropped at release");
                self.drop_event(&event, "ancient");
                continue;
            }

            let descriptor = event.descriptor();
            self.released.insert(descriptor.clone(), ());
            if let Some(children) = self.missing_parents.remove(&descriptor) {
                for child in children {
                    if let Some(ready) = self.resolve_parent(&child, &descriptor) {
                        stack.push(ready);
                    }
                }
            }

            self.intake_counter
                .event_exited_intake_pipeline(event.sender_id());
            released.push(event);
        }
        released
    }

    fn evict_stale_orphans(&mut self) {
        let mode = self.window.ancient_mode();
        let stale: Vec<EventDescriptor> = self
            .orphans
            .keys()
            .filter(|descriptor| self.window.is_ancient(descriptor.ancient_indicator(mode)))
            .cloned()
            .collect();

        for descriptor in stale {
            if let Some(orphan) = self.orphans.remove(&descriptor) {
                debug!(
                    event = %orphan.event,
                    missing = orphan.missing.len(),
                    "Stale orphan evicted"
                );
                self.drop_event(&orphan.event, "stale_orphan");
            }
        }
    }

    fn drop_event(&self, event: &GossipEvent, reason: &'static str) {
        self.metrics.record_dropped(IntakeStage::OrphanBuffer, reason);
        self.intake_counter
            .event_exited_intake_pipeline(event.sender_id());
    }

    fn report_size(&self) {
        self.metrics.set_orphan_buffer_size(self.orphans.len());
    }
}
