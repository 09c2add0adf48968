//! Cross-crate tests driving `EventIntakeService` end to end.

pub mod orphan_stress;
pub mod properties;
pub mod scenarios;
