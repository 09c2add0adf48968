//! # Intake Event Counter
//!
//! Tracks, per sending peer, how many of its events are inside the intake
//! pipeline. Gossip consults it to avoid re-requesting events from a peer
//! whose previous batch has not been processed yet.
//!
//! An event enters when submitted with a sender and exits when a stage drops
//! it or the orphan buffer releases it.

use std::collections::HashMap;

use parking_lot::Mutex;
use shared_types::NodeId;
use tracing::warn;

/// Per-peer in-pipeline event counts.
#[derive(Debug, Default)]
pub struct IntakeEventCounter {
    counts: Mutex<HashMap<NodeId, usize>>,
}

impl IntakeEventCounter {
    /// Empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An event from `peer` entered the pipeline.
    pub fn event_entered_intake_pipeline(&self, peer: Option<NodeId>) {
        if let Some(peer) = peer {
            *self.counts.lock().entry(peer).or_insert(0) += 1;
        }
    }

    /// An event from `peer` left the pipeline (dropped or released).
    pub fn event_exited_intake_pipeline(&self, peer: Option<NodeId>) {
        let Some(peer) = peer else {
            return;
        };
        let mut counts = self.counts.lock();
        match counts.get_mut(&peer) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                counts.remove(&peer);
            }
            None => warn!(peer = %peer, "Event exited intake pipeline without entering"),
        }
    }

    /// True if any event from `peer` is still inside the pipeline.
    #[must_use]
    pub fn has_unprocessed_events(&self, peer: NodeId) -> bool {
        self.counts.lock().contains_key(&peer)
    }

    /// Events from `peer` currently inside the pipeline.
    #[must_use]
    pub fn unprocessed_events(&self, peer: NodeId) -> usize {
        self.counts.lock().get(&peer).copied().unwrap_or(0)
    }

    /// Forget all counts. Called after the pipeline has been cleared.
    pub fn reset(&self) {
        self.counts.lock().clear();
    }
}
