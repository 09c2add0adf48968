//! # Shared Wiring - Back-Pressured Task Schedulers
//!
//! Substrate for building processing pipelines out of independently
//! scheduled stages connected by typed, bounded wires.
//!
//! ## Building Blocks
//!
//! ```text
//!               WiringModel (worker pool + registry)
//!                         │ scheduler_builder(name)
//!                         ▼
//!  put/inject/offer  ┌──────────────────────────┐  OutputWire<OUT>
//!  ─────────────────►│ InputWire<IN> ─► handler │──────────────────► ...
//!                    │   on-ramp        off-ramp│
//!                    └──────────────────────────┘
//! ```
//!
//! - **Counters** bound how many items are in flight. A full counter blocks
//!   `put`, rejects `offer` and is bypassed by `inject`.
//! - **Schedulers** run handlers as `CONCURRENT`, `SEQUENTIAL`,
//!   `SEQUENTIAL_THREAD`, `DIRECT` or `DIRECT_THREADSAFE`.
//! - **Wires** connect schedulers and can be transformed, filtered and split.
//! - **Flush** blocks until a scheduler has drained; **squelch** discards
//!   tasks at execution time.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod counters;
pub mod errors;
pub mod model;
pub mod scheduler;
pub mod wires;

pub use config::{TaskSchedulerConfig, TaskSchedulerType};
pub use counters::{
    BackpressureObjectCounter, NoOpObjectCounter, ObjectCounter, StandardObjectCounter,
    DEFAULT_SLEEP_DURATION,
};
pub use errors::WiringError;
pub use model::WiringModel;
pub use scheduler::{SchedulerHandle, TaskScheduler, TaskSchedulerBuilder};
pub use wires::{BindableInputWire, InputWire, OutputWire, SolderType};
