//! # Task Schedulers
//!
//! A scheduler executes the handlers bound to its input wires under one
//! concurrency policy (`TaskSchedulerType`). Every task is counted in on the
//! scheduler's on-ramp counter when submitted and counted out on its
//! off-ramp counter when the handler (including forwarding of its output)
//! has finished.
//!
//! ## Execution
//!
//! | Type | Where the handler runs |
//! |------|------------------------|
//! | `Concurrent` | any shared-pool worker |
//! | `Sequential` | one shared-pool worker at a time, FIFO |
//! | `SequentialThread` | the scheduler's own thread, FIFO |
//! | `Direct` | caller's thread, serialized |
//! | `DirectThreadsafe` | caller's thread |
//!
//! A handler panic is caught, logged with the scheduler, wire and item, and
//! the item is dropped. The scheduler keeps running.
//!
//! Squelching discards tasks when they reach execution. It applies either to
//! the whole scheduler or to a single input wire, in which case the
//! scheduler's other inputs keep running.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, ReentrantMutex};
use rayon::ThreadPool;
use tracing::{debug, error, warn};

use crate::config::{TaskSchedulerConfig, TaskSchedulerType};
use crate::counters::{
    BackpressureObjectCounter, NoOpObjectCounter, ObjectCounter, StandardObjectCounter,
    DEFAULT_SLEEP_DURATION,
};
use crate::errors::WiringError;
use crate::model::{InputWireRecord, Registry};
use crate::wires::{BindableInputWire, InputWire, OutputWire};

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Tasks a sequential drain job runs before yielding its pool worker.
const SEQUENTIAL_BATCH: usize = 64;

// =============================================================================
// EXECUTORS
// =============================================================================

#[derive(Default)]
struct SequentialState {
    tasks: VecDeque<Task>,
    draining: bool,
}

/// FIFO queue drained by at most one pool job at a time.
#[derive(Default)]
struct SequentialQueue {
    state: Mutex<SequentialState>,
}

impl SequentialQueue {
    fn push(self: &Arc<Self>, pool: &Arc<ThreadPool>, task: Task) {
        let mut state = self.state.lock();
        state.tasks.push_back(task);
        if state.draining {
            return;
        }
        state.draining = true;
        drop(state);
        Self::spawn_drain(Arc::clone(self), Arc::clone(pool));
    }

    fn spawn_drain(queue: Arc<Self>, pool: Arc<ThreadPool>) {
        let runner = Arc::clone(&pool);
        pool.spawn(move || queue.drain(runner));
    }

    fn drain(self: Arc<Self>, pool: Arc<ThreadPool>) {
        for _ in 0..SEQUENTIAL_BATCH {
            let task = {
                let mut state = self.state.lock();
                match state.tasks.pop_front() {
                    Some(task) => task,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            task();
        }
        Self::spawn_drain(self, pool);
    }
}

enum Command {
    Run(Task),
    Stop,
}

/// Scheduler-owned thread fed through a channel.
struct DedicatedThread {
    sender: Mutex<Option<mpsc::Sender<Command>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DedicatedThread {
    fn spawn(name: &str) -> Result<Self, WiringError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let handle = thread::Builder::new()
            .name(format!("scheduler-{name}"))
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    match command {
                        Command::Run(task) => task(),
                        Command::Stop => break,
                    }
                }
            })
            .map_err(|_| WiringError::ThreadSpawn(name.to_string()))?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Returns false if the thread has been stopped. The task is dropped.
    fn send(&self, task: Task) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(Command::Run(task)).is_ok(),
            None => false,
        }
    }

    fn stop(&self) {
        if let Some(sender) = self.sender.lock().take() {
            let _ = sender.send(Command::Stop);
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

enum Executor {
    Concurrent(Arc<ThreadPool>),
    Sequential {
        pool: Arc<ThreadPool>,
        queue: Arc<SequentialQueue>,
    },
    SequentialThread(DedicatedThread),
    Direct(ReentrantMutex<()>),
    DirectThreadsafe,
}

/// Counts a task out when dropped, whether or not it ran.
struct OffRampGuard(Arc<dyn ObjectCounter>);

impl Drop for OffRampGuard {
    fn drop(&mut self) {
        self.0.off_ramp();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// SCHEDULER CORE
// =============================================================================

pub(crate) struct SchedulerCore {
    name: String,
    scheduler_type: TaskSchedulerType,
    pub(crate) on_ramp: Arc<dyn ObjectCounter>,
    pub(crate) off_ramp: Arc<dyn ObjectCounter>,
    flushing_enabled: bool,
    squelching_enabled: bool,
    squelched: AtomicBool,
    executor: Executor,
}

impl SchedulerCore {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Wrap `work` with squelch checks, panic isolation and off-ramp.
    pub(crate) fn wrap<F>(
        self: &Arc<Self>,
        wire: Arc<str>,
        wire_squelched: Arc<AtomicBool>,
        description: Cow<'static, str>,
        work: F,
    ) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        let core = Arc::clone(self);
        let guard = OffRampGuard(Arc::clone(&self.off_ramp));
        Box::new(move || {
            let _guard = guard;
            if core.squelched.load(Ordering::Acquire) || wire_squelched.load(Ordering::Acquire) {
                return;
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(work)) {
                error!(
                    scheduler = %core.name,
                    wire = %wire,
                    item = %description,
                    panic = %panic_message(payload.as_ref()),
                    "Handler panicked, item dropped"
                );
            }
        })
    }

    pub(crate) fn execute(&self, task: Task) {
        match &self.executor {
            Executor::Concurrent(pool) => pool.spawn(task),
            Executor::Sequential { pool, queue } => queue.push(pool, task),
            Executor::SequentialThread(thread) => {
                if !thread.send(task) {
                    warn!(scheduler = %self.name, "Scheduler thread stopped, task dropped");
                }
            }
            Executor::Direct(lock) => {
                let _serialized = lock.lock();
                task();
            }
            Executor::DirectThreadsafe => task(),
        }
    }

    fn flush(&self) -> Result<(), WiringError> {
        if !self.flushing_enabled {
            return Err(WiringError::FlushNotSupported(self.name.clone()));
        }
        match &self.executor {
            Executor::Direct(_) | Executor::DirectThreadsafe => {}
            Executor::Concurrent(_) => self.on_ramp.wait_until_empty(),
            Executor::Sequential { pool, queue } => {
                let (done, wait) = mpsc::sync_channel(1);
                queue.push(
                    pool,
                    Box::new(move || {
                        let _ = done.send(());
                    }),
                );
                let _ = wait.recv();
            }
            Executor::SequentialThread(thread) => {
                let (done, wait) = mpsc::sync_channel(1);
                if thread.send(Box::new(move || {
                    let _ = done.send(());
                })) {
                    let _ = wait.recv();
                }
            }
        }
        debug!(scheduler = %self.name, "Flushed");
        Ok(())
    }

    /// Set `flag` if this scheduler was built squelchable.
    pub(crate) fn set_squelched(&self, flag: &AtomicBool, squelched: bool) -> Result<(), WiringError> {
        if !self.squelching_enabled {
            return Err(WiringError::SquelchNotSupported(self.name.clone()));
        }
        flag.store(squelched, Ordering::Release);
        Ok(())
    }

    pub(crate) fn shutdown(&self) {
        if let Executor::SequentialThread(thread) = &self.executor {
            thread.stop();
        }
    }
}

// =============================================================================
// PUBLIC HANDLES
// =============================================================================

/// Type-erased handle to a scheduler, for flush/squelch/introspection.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(crate) core: Arc<SchedulerCore>,
}

impl SchedulerHandle {
    /// Scheduler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Concurrency policy.
    #[must_use]
    pub fn scheduler_type(&self) -> TaskSchedulerType {
        self.core.scheduler_type
    }

    /// Block until every task submitted before this call has completed.
    pub fn flush(&self) -> Result<(), WiringError> {
        self.core.flush()
    }

    /// Items counted in on this scheduler's on-ramp and not yet counted out.
    #[must_use]
    pub fn unprocessed_count(&self) -> usize {
        self.core.on_ramp.count()
    }

    /// Discard tasks that reach execution from now on, without running them.
    pub fn start_squelching(&self) -> Result<(), WiringError> {
        self.core.set_squelched(&self.core.squelched, true)
    }

    /// Resume running tasks.
    pub fn stop_squelching(&self) -> Result<(), WiringError> {
        self.core.set_squelched(&self.core.squelched, false)
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("name", &self.core.name)
            .field("type", &self.core.scheduler_type)
            .finish()
    }
}

/// A scheduler whose handlers produce values of type `OUT`.
pub struct TaskScheduler<OUT> {
    handle: SchedulerHandle,
    output: OutputWire<OUT>,
    registry: Arc<Registry>,
}

impl<OUT> Clone for TaskScheduler<OUT> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            output: self.output.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<OUT: Clone + Send + 'static> TaskScheduler<OUT> {
    /// Create a new input wire on this scheduler. Bind a handler before start.
    pub fn build_input_wire<IN: Send + 'static>(&self, name: &str) -> BindableInputWire<IN, OUT> {
        let handler = Arc::new(OnceLock::new());
        let bound = Arc::clone(&handler);
        self.registry.record_input_wire(InputWireRecord {
            scheduler: self.handle.name().to_string(),
            wire: name.to_string(),
            is_bound: Box::new(move || bound.get().is_some()),
        });
        let wire = InputWire::new(Arc::clone(&self.handle.core), name, handler);
        BindableInputWire::new(wire, self.output.clone())
    }

    /// Wire carrying every value returned by this scheduler's handlers.
    #[must_use]
    pub fn output_wire(&self) -> &OutputWire<OUT> {
        &self.output
    }

    /// Type-erased handle.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Scheduler name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// See [`SchedulerHandle::flush`].
    pub fn flush(&self) -> Result<(), WiringError> {
        self.handle.flush()
    }

    /// See [`SchedulerHandle::unprocessed_count`].
    #[must_use]
    pub fn unprocessed_count(&self) -> usize {
        self.handle.unprocessed_count()
    }

    /// See [`SchedulerHandle::start_squelching`].
    pub fn start_squelching(&self) -> Result<(), WiringError> {
        self.handle.start_squelching()
    }

    /// See [`SchedulerHandle::stop_squelching`].
    pub fn stop_squelching(&self) -> Result<(), WiringError> {
        self.handle.stop_squelching()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

fn validate_name(name: &str) -> Result<(), WiringError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(WiringError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Builder returned by [`crate::WiringModel::scheduler_builder`].
#[must_use]
pub struct TaskSchedulerBuilder {
    registry: Arc<Registry>,
    pool: Arc<ThreadPool>,
    name: String,
    scheduler_type: TaskSchedulerType,
    unhandled_task_capacity: Option<usize>,
    on_ramp: Option<Arc<dyn ObjectCounter>>,
    off_ramp: Option<Arc<dyn ObjectCounter>>,
    flushing_enabled: bool,
    squelching_enabled: bool,
}

impl TaskSchedulerBuilder {
    pub(crate) fn new(registry: Arc<Registry>, pool: Arc<ThreadPool>, name: String) -> Self {
        Self {
            registry,
            pool,
            name,
            scheduler_type: TaskSchedulerType::default(),
            unhandled_task_capacity: None,
            on_ramp: None,
            off_ramp: None,
            flushing_enabled: false,
            squelching_enabled: false,
        }
    }

    /// Apply type, capacity and capability flags from a config.
    pub fn configure(mut self, config: &TaskSchedulerConfig) -> Self {
        self.scheduler_type = config.scheduler_type;
        self.unhandled_task_capacity = config.unhandled_task_capacity;
        self.flushing_enabled = config.flushing_enabled;
        self.squelching_enabled = config.squelching_enabled;
        self
    }

    pub fn with_type(mut self, scheduler_type: TaskSchedulerType) -> Self {
        self.scheduler_type = scheduler_type;
        self
    }

    pub fn with_unhandled_capacity(mut self, capacity: usize) -> Self {
        self.unhandled_task_capacity = Some(capacity);
        self
    }

    /// Counter incremented when a task is submitted. Overrides the default.
    pub fn with_on_ramp(mut self, counter: Arc<dyn ObjectCounter>) -> Self {
        self.on_ramp = Some(counter);
        self
    }

    /// Counter decremented when a task completes. Overrides the default.
    pub fn with_off_ramp(mut self, counter: Arc<dyn ObjectCounter>) -> Self {
        self.off_ramp = Some(counter);
        self
    }

    pub fn with_flushing_enabled(mut self, enabled: bool) -> Self {
        self.flushing_enabled = enabled;
        self
    }

    pub fn with_squelching_enabled(mut self, enabled: bool) -> Self {
        self.squelching_enabled = enabled;
        self
    }

    fn validate(&self) -> Result<(), WiringError> {
        validate_name(&self.name)?;
        if self.unhandled_task_capacity == Some(0) {
            return Err(WiringError::InvalidConfiguration(format!(
                "{}: capacity must be at least 1",
                self.name
            )));
        }
        if self.scheduler_type.is_direct() {
            if self.unhandled_task_capacity.is_some() {
                return Err(WiringError::InvalidConfiguration(format!(
                    "{}: direct schedulers have no queue to bound",
                    self.name
                )));
            }
            if self.squelching_enabled {
                return Err(WiringError::InvalidConfiguration(format!(
                    "{}: direct schedulers cannot be squelched",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Build the scheduler and register it with the model.
    pub fn build<OUT: Clone + Send + 'static>(self) -> Result<TaskScheduler<OUT>, WiringError> {
        self.validate()?;

        let mut schedulers = self.registry.schedulers.lock();
        if schedulers.iter().any(|s| s.name() == self.name) {
            return Err(WiringError::DuplicateName(self.name));
        }

        let default_counter: Arc<dyn ObjectCounter> =
            match (self.unhandled_task_capacity, self.scheduler_type.is_direct()) {
                (Some(capacity), _) => Arc::new(BackpressureObjectCounter::new(
                    self.name.clone(),
                    capacity,
                    DEFAULT_SLEEP_DURATION,
                )),
                (None, true) => Arc::new(NoOpObjectCounter),
                (None, false) => Arc::new(StandardObjectCounter::new()),
            };
        let on_ramp = self.on_ramp.unwrap_or_else(|| Arc::clone(&default_counter));
        let off_ramp = self.off_ramp.unwrap_or(default_counter);

        let executor = match self.scheduler_type {
            TaskSchedulerType::Concurrent => Executor::Concurrent(Arc::clone(&self.pool)),
            TaskSchedulerType::Sequential => Executor::Sequential {
                pool: Arc::clone(&self.pool),
                queue: Arc::new(SequentialQueue::default()),
            },
            TaskSchedulerType::SequentialThread => {
                Executor::SequentialThread(DedicatedThread::spawn(&self.name)?)
            }
            TaskSchedulerType::Direct => Executor::Direct(ReentrantMutex::new(())),
            TaskSchedulerType::DirectThreadsafe => Executor::DirectThreadsafe,
        };

        let handle = SchedulerHandle {
            core: Arc::new(SchedulerCore {
                name: self.name.clone(),
                scheduler_type: self.scheduler_type,
                on_ramp,
                off_ramp,
                flushing_enabled: self.flushing_enabled,
                squelching_enabled: self.squelching_enabled,
                squelched: AtomicBool::new(false),
                executor,
            }),
        };
        schedulers.push(handle.clone());
        drop(schedulers);

        let has_output = TypeId::of::<OUT>() != TypeId::of::<()>();
        let output = OutputWire::new(Arc::clone(&self.registry), &self.name, "output", has_output);

        debug!(
            scheduler = %self.name,
            scheduler_type = %self.scheduler_type,
            capacity = ?self.unhandled_task_capacity,
            "Built task scheduler"
        );

        Ok(TaskScheduler {
            handle,
            output,
            registry: self.registry,
        })
    }
}

/// Fallback item description when an input wire has no describer.
pub(crate) fn type_description<T>() -> Cow<'static, str> {
    Cow::Borrowed(type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WiringModel;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn model() -> WiringModel {
        WiringModel::new(2).unwrap()
    }

    #[test]
    fn test_name_validation() {
        let model = model();
        assert!(matches!(
            model.scheduler_builder("").build::<()>(),
            Err(WiringError::InvalidName(_))
        ));
        assert!(matches!(
            model.scheduler_builder("bad name").build::<()>(),
            Err(WiringError::InvalidName(_))
        ));
        assert!(model.scheduler_builder("good_name_1").build::<()>().is_ok());
        assert!(matches!(
            model.scheduler_builder("good_name_1").build::<()>(),
            Err(WiringError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_direct_rejects_capacity() {
        let model = model();
        let result = model
            .scheduler_builder("direct")
            .with_type(TaskSchedulerType::Direct)
            .with_unhandled_capacity(5)
            .build::<()>();
        assert!(matches!(result, Err(WiringError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_sequential_preserves_order() {
        let model = model();
        let scheduler = model
            .scheduler_builder("ordered")
            .with_flushing_enabled(true)
            .build::<()>()
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let input = scheduler.build_input_wire::<u32>("numbers");
        let sink = Arc::clone(&seen);
        input.bind_consumer(move |n| sink.lock().push(n)).unwrap();

        let wire = input.input_wire();
        for n in 0..500 {
            wire.put(n);
        }
        scheduler.flush().unwrap();

        assert_eq!(*seen.lock(), (0..500).collect::<Vec<_>>());
        assert_eq!(scheduler.unprocessed_count(), 0);
    }

    #[test]
    fn test_sequential_thread_preserves_order() {
        let model = model();
        let scheduler = model
            .scheduler_builder("dedicated")
            .with_type(TaskSchedulerType::SequentialThread)
            .with_unhandled_capacity(8)
            .with_flushing_enabled(true)
            .build::<()>()
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let input = scheduler.build_input_wire::<u32>("numbers");
        let sink = Arc::clone(&seen);
        input.bind_consumer(move |n| sink.lock().push(n)).unwrap();

        let wire = input.input_wire();
        for n in 0..100 {
            wire.put(n);
        }
        scheduler.flush().unwrap();
        model.stop();

        assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_flush_waits_for_all() {
        let model = model();
        let scheduler = model
            .scheduler_builder("parallel")
            .with_type(TaskSchedulerType::Concurrent)
            .with_flushing_enabled(true)
            .build::<()>()
            .unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let input = scheduler.build_input_wire::<u64>("sleeps");
        let counter = Arc::clone(&done);
        input
            .bind_consumer(move |millis| {
                thread::sleep(Duration::from_millis(millis));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let wire = input.input_wire();
        for _ in 0..16 {
            wire.put(5);
        }
        scheduler.flush().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 16);
        assert_eq!(scheduler.unprocessed_count(), 0);
    }

    #[test]
    fn test_flush_not_supported() {
        let model = model();
        let scheduler = model.scheduler_builder("plain").build::<()>().unwrap();
        assert_eq!(
            scheduler.flush(),
            Err(WiringError::FlushNotSupported("plain".to_string()))
        );
    }

    #[test]
    fn test_panic_does_not_stop_scheduler() {
        let model = model();
        let scheduler = model
            .scheduler_builder("fragile")
            .with_unhandled_capacity(4)
            .with_flushing_enabled(true)
            .build::<()>()
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let input = scheduler.build_input_wire::<u32>("numbers");
        let sink = Arc::clone(&seen);
        input
            .bind_consumer(move |n| {
                if n == 2 {
                    panic!("bad item {n}");
                }
                sink.lock().push(n);
            })
            .unwrap();

        let wire = input.input_wire();
        for n in 0..5 {
            wire.put(n);
        }
        scheduler.flush().unwrap();

        assert_eq!(*seen.lock(), vec![0, 1, 3, 4]);
        assert_eq!(scheduler.unprocessed_count(), 0);
    }

    #[test]
    fn test_squelch_discards_and_counts_out() {
        let model = model();
        let scheduler = model
            .scheduler_builder("quiet")
            .with_unhandled_capacity(4)
            .with_flushing_enabled(true)
            .with_squelching_enabled(true)
            .build::<()>()
            .unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let input = scheduler.build_input_wire::<u32>("numbers");
        let sink = Arc::clone(&seen);
        input
            .bind_consumer(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        scheduler.start_squelching().unwrap();
        let wire = input.input_wire();
        for n in 0..10 {
            wire.put(n);
        }
        scheduler.flush().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.unprocessed_count(), 0);

        scheduler.stop_squelching().unwrap();
        wire.put(11);
        scheduler.flush().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wire_squelch_spares_other_inputs() {
        let model = model();
        let scheduler = model
            .scheduler_builder("split_quiet")
            .with_unhandled_capacity(8)
            .with_flushing_enabled(true)
            .with_squelching_enabled(true)
            .build::<()>()
            .unwrap();
        let data = Arc::new(AtomicUsize::new(0));
        let control = Arc::new(AtomicUsize::new(0));

        let data_input = scheduler.build_input_wire::<u32>("data");
        let sink = Arc::clone(&data);
        data_input
            .bind_consumer(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let control_input = scheduler.build_input_wire::<u32>("control");
        let sink = Arc::clone(&control);
        control_input
            .bind_consumer(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let data_wire = data_input.input_wire();
        let control_wire = control_input.input_wire();
        data_wire.start_squelching().unwrap();
        for n in 0..5 {
            data_wire.put(n);
            control_wire.inject(n);
        }
        scheduler.flush().unwrap();
        assert_eq!(data.load(Ordering::SeqCst), 0);
        assert_eq!(control.load(Ordering::SeqCst), 5);
        assert_eq!(scheduler.unprocessed_count(), 0);

        data_wire.stop_squelching().unwrap();
        data_wire.put(9);
        scheduler.flush().unwrap();
        assert_eq!(data.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wire_squelch_requires_squelchable_scheduler() {
        let model = model();
        let scheduler = model.scheduler_builder("loud_wire").build::<()>().unwrap();
        let input = scheduler.build_input_wire::<u32>("in");
        input.bind_consumer(|_| {}).unwrap();
        assert!(matches!(
            input.input_wire().start_squelching(),
            Err(WiringError::SquelchNotSupported(_))
        ));
    }

    #[test]
    fn test_squelch_not_supported() {
        let model = model();
        let scheduler = model.scheduler_builder("loud").build::<()>().unwrap();
        assert!(matches!(
            scheduler.start_squelching(),
            Err(WiringError::SquelchNotSupported(_))
        ));
    }

    #[test]
    fn test_bounded_submit_blocks() {
        let model = model();
        let scheduler = model
            .scheduler_builder("narrow")
            .with_unhandled_capacity(1)
            .with_flushing_enabled(true)
            .build::<()>()
            .unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let input = scheduler.build_input_wire::<u32>("gate");
        input
            .bind_consumer(move |_| {
                let _ = release_rx.lock().recv_timeout(Duration::from_secs(5));
            })
            .unwrap();

        let wire = input.input_wire();
        wire.put(1);

        let (submitted_tx, submitted_rx) = mpsc::channel();
        let blocked = wire.clone();
        let submitter = thread::spawn(move || {
            let started = Instant::now();
            blocked.put(2);
            submitted_tx.send(started.elapsed()).unwrap();
        });

        assert!(submitted_rx.recv_timeout(Duration::from_millis(100)).is_err());
        release_tx.send(()).unwrap();
        submitted_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        release_tx.send(()).unwrap();
        submitter.join().unwrap();
        scheduler.flush().unwrap();
        assert_eq!(scheduler.unprocessed_count(), 0);
    }
}
