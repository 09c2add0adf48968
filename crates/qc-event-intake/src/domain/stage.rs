//! Pipeline stage identifiers, used in logs and metric labels.

use std::fmt;

/// A stage of the intake chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntakeStage {
    Hasher,
    PostHashCollector,
    InternalValidator,
    Deduplicator,
    SignatureValidator,
    OrphanBuffer,
}

impl IntakeStage {
    /// Every stage, in pipeline order.
    pub const ALL: [IntakeStage; 6] = [
        Self::Hasher,
        Self::PostHashCollector,
        Self::InternalValidator,
        Self::Deduplicator,
        Self::SignatureValidator,
        Self::OrphanBuffer,
    ];

    /// Scheduler name and metric label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hasher => "event_hasher",
            Self::PostHashCollector => "post_hash_collector",
            Self::InternalValidator => "internal_event_validator",
            Self::Deduplicator => "event_deduplicator",
            Self::SignatureValidator => "event_signature_validator",
            Self::OrphanBuffer => "orphan_buffer",
        }
    }
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
