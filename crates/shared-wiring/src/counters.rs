//! # Object Counters
//!
//! Counters track how many items are in flight between the moment they are
//! submitted to a scheduler (on-ramp) and the moment their handler finishes
//! (off-ramp). A bounded counter turns that count into backpressure.
//!
//! One counter may be shared by several schedulers: the first scheduler
//! on-ramps, the last one off-ramps, and the whole span is bounded as a unit.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

/// Default time a pool worker waits on a full counter before retrying.
pub const DEFAULT_SLEEP_DURATION: Duration = Duration::from_micros(100);

/// In-flight item counter.
pub trait ObjectCounter: Send + Sync {
    /// Count an item in, blocking while the counter is at capacity.
    fn on_ramp(&self);

    /// Count an item in if there is room. Never blocks.
    fn attempt_on_ramp(&self) -> bool;

    /// Count an item in regardless of capacity. Never blocks.
    fn force_on_ramp(&self);

    /// Count an item out.
    fn off_ramp(&self);

    /// Items currently counted in.
    fn count(&self) -> usize;

    /// Block until the count reaches zero.
    fn wait_until_empty(&self);
}

// =============================================================================
// BACKPRESSURE
// =============================================================================

/// Bounded counter. `on_ramp` blocks once `capacity` items are in flight.
///
/// Each `off_ramp` wakes exactly one blocked submitter. A submitter running on
/// a rayon worker does not park; it runs other pool work while it waits so
/// that pool-hosted stages keep draining.
pub struct BackpressureObjectCounter {
    name: String,
    capacity: usize,
    count: Mutex<usize>,
    not_full: Condvar,
    empty: Condvar,
    sleep_duration: Duration,
}

impl BackpressureObjectCounter {
    /// Create a counter. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(name: impl Into<String>, capacity: usize, sleep_duration: Duration) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            count: Mutex::new(0),
            not_full: Condvar::new(),
            empty: Condvar::new(),
            sleep_duration,
        }
    }

    fn on_ramp_helping(&self) {
        loop {
            if self.attempt_on_ramp() {
                return;
            }
            match rayon::yield_now() {
                Some(rayon::Yield::Executed) => continue,
                _ => {
                    let mut count = self.count.lock();
                    if *count < self.capacity {
                        *count += 1;
                        return;
                    }
                    self.not_full.wait_for(&mut count, self.sleep_duration);
                }
            }
        }
    }
}

impl ObjectCounter for BackpressureObjectCounter {
    fn on_ramp(&self) {
        if rayon::current_thread_index().is_some() {
            self.on_ramp_helping();
            return;
        }
        let mut count = self.count.lock();
        while *count >= self.capacity {
            self.not_full.wait(&mut count);
        }
        *count += 1;
    }

    fn attempt_on_ramp(&self) -> bool {
        let mut count = self.count.lock();
        if *count >= self.capacity {
            return false;
        }
        *count += 1;
        true
    }

    fn force_on_ramp(&self) {
        *self.count.lock() += 1;
    }

    fn off_ramp(&self) {
        let mut count = self.count.lock();
        if *count == 0 {
            warn!(counter = %self.name, "off_ramp called on empty counter");
            return;
        }
        *count -= 1;
        if *count < self.capacity {
            self.not_full.notify_one();
        }
        if *count == 0 {
            self.empty.notify_all();
        }
    }

    fn count(&self) -> usize {
        *self.count.lock()
    }

    fn wait_until_empty(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.empty.wait(&mut count);
        }
    }
}

// =============================================================================
// UNBOUNDED
// =============================================================================

/// Unbounded counter. Counts items but never blocks on the way in.
#[derive(Default)]
pub struct StandardObjectCounter {
    count: Mutex<usize>,
    empty: Condvar,
}

impl StandardObjectCounter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectCounter for StandardObjectCounter {
    fn on_ramp(&self) {
        *self.count.lock() += 1;
    }

    fn attempt_on_ramp(&self) -> bool {
        self.on_ramp();
        true
    }

    fn force_on_ramp(&self) {
        self.on_ramp();
    }

    fn off_ramp(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.empty.notify_all();
        }
    }

    fn count(&self) -> usize {
        *self.count.lock()
    }

    fn wait_until_empty(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.empty.wait(&mut count);
        }
    }
}

/// Counter that counts nothing. Used where another scheduler owns the count.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObjectCounter;

impl ObjectCounter for NoOpObjectCounter {
    fn on_ramp(&self) {}

    fn attempt_on_ramp(&self) -> bool {
        true
    }

    fn force_on_ramp(&self) {}

    fn off_ramp(&self) {}

    fn count(&self) -> usize {
        0
    }

    fn wait_until_empty(&self) {}
}
