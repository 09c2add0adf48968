//! # Hashgraph Intake Test Suite
//!
//! Unified test crate for the event intake pipeline.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Service + collecting collaborators
//! └── integration/
//!     ├── scenarios.rs      # Single-event release scenarios
//!     ├── properties.rs     # Dedup, flush, clear, backpressure
//!     └── orphan_stress.rs  # Seeded random hashgraphs
//!
//! tests/benches/
//! └── intake_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! cargo test -p qc-tests integration::scenarios::
//! cargo bench -p qc-tests
//! ```

pub mod harness;
pub mod integration;
