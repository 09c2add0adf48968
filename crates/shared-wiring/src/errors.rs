//! # Error Types
//!
//! Errors raised while building, wiring and operating task schedulers.

use thiserror::Error;

/// Errors from the wiring substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringError {
    /// `flush()` called on a scheduler built without flushing.
    #[error("Scheduler {0} does not support flushing")]
    FlushNotSupported(String),

    /// Squelching requested on a scheduler built without squelching.
    #[error("Scheduler {0} does not support squelching")]
    SquelchNotSupported(String),

    /// An input wire has no handler at start time.
    #[error("Input wire {scheduler}.{wire} was never bound to a handler")]
    UnboundInputWire { scheduler: String, wire: String },

    /// A handler was bound twice to the same input wire.
    #[error("Input wire {scheduler}.{wire} is already bound")]
    HandlerAlreadyBound { scheduler: String, wire: String },

    /// Ordinary solder connections form a loop that can deadlock on backpressure.
    #[error("Cyclical backpressure: {0}")]
    CyclicalBackpressure(String),

    /// Scheduler name is empty or contains characters outside `[A-Za-z0-9_]`.
    #[error("Illegal scheduler name: {0:?}")]
    InvalidName(String),

    /// Two schedulers share a name in one model.
    #[error("Scheduler name already in use: {0}")]
    DuplicateName(String),

    /// Scheduler configuration is malformed or inconsistent.
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfiguration(String),

    /// `start()` called on a model that is already running.
    #[error("Wiring model already started")]
    AlreadyStarted,

    /// `start()` called after `stop()`; dedicated threads are gone.
    #[error("Wiring model was stopped")]
    Stopped,

    /// A dedicated thread could not be spawned.
    #[error("Failed to spawn thread for {0}")]
    ThreadSpawn(String),

    /// The shared worker pool could not be built.
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),
}
