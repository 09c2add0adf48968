//! # In-Memory Misbehavior Tracker
//!
//! Counts invalid-signature reports per creator and per delivering peer.
//! A peer that keeps relaying badly signed events is logged once it crosses
//! the warning threshold.

use std::collections::HashMap;

use parking_lot::Mutex;
use shared_types::{EventDescriptor, NodeId};
use tracing::{error, warn};

use crate::ports::outbound::MisbehaviorReporter;

/// Reports from one peer before an error line is logged.
pub const DEFAULT_REPORT_THRESHOLD: usize = 10;

#[derive(Debug, Default)]
struct Reports {
    by_creator: HashMap<NodeId, usize>,
    by_sender: HashMap<NodeId, usize>,
    total: usize,
}

/// `MisbehaviorReporter` that keeps counts in memory.
#[derive(Debug)]
pub struct InMemoryMisbehaviorTracker {
    threshold: usize,
    reports: Mutex<Reports>,
}

impl Default for InMemoryMisbehaviorTracker {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_REPORT_THRESHOLD)
    }
}

impl InMemoryMisbehaviorTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold,
            reports: Mutex::new(Reports::default()),
        }
    }

    /// Invalid signatures attributed to `creator`.
    #[must_use]
    pub fn invalid_signatures_from(&self, creator: NodeId) -> usize {
        self.reports.lock().by_creator.get(&creator).copied().unwrap_or(0)
    }

    /// Badly signed events delivered by `sender`.
    #[must_use]
    pub fn reports_against_sender(&self, sender: NodeId) -> usize {
        self.reports.lock().by_sender.get(&sender).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_reports(&self) -> usize {
        self.reports.lock().total
    }
}

impl MisbehaviorReporter for InMemoryMisbehaviorTracker {
    fn report_invalid_signature(
        &self,
        creator: NodeId,
        sender: Option<NodeId>,
        event: &EventDescriptor,
    ) {
        let mut reports = self.reports.lock();
        reports.total += 1;
        *reports.by_creator.entry(creator).or_insert(0) += 1;

        let Some(sender) = sender else {
            warn!(creator = %creator, event = %event, "Invalid signature on locally submitted event");
            return;
        };
        let count = reports.by_sender.entry(sender).or_insert(0);
        *count += 1;
        if *count == self.threshold {
            error!(sender = %sender, reports = *count, "Peer repeatedly relays events with invalid signatures");
        }
    }
}
