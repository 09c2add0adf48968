//! # Wiring Model
//!
//! The explicit context object that owns the shared worker pool and knows
//! every scheduler, wire and solder connection built against it. Constructed
//! by the composition root and passed to whatever builds schedulers.
//!
//! `start()` checks the wiring before anything flows:
//! - every input wire has a handler
//! - ordinary (`Standard`) solder connections contain no cycle
//! - output wires with no destination are reported
//!
//! `stop()` is final. Dedicated scheduler threads are joined, so a stopped
//! model refuses to start again.
//!
//! `diagram()` renders the schedulers and solder connections as a Mermaid
//! flowchart.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use rayon::ThreadPool;
use tracing::{info, warn};

use crate::config::TaskSchedulerType;
use crate::errors::WiringError;
use crate::scheduler::{SchedulerHandle, TaskSchedulerBuilder};
use crate::wires::{OutputWire, SolderType};

// =============================================================================
// REGISTRY
// =============================================================================

pub(crate) struct InputWireRecord {
    pub(crate) scheduler: String,
    pub(crate) wire: String,
    pub(crate) is_bound: Box<dyn Fn() -> bool + Send + Sync>,
}

pub(crate) struct OutputWireRecord {
    pub(crate) owner: String,
    pub(crate) wire: String,
    pub(crate) destinations: Arc<AtomicUsize>,
}

pub(crate) struct Edge {
    pub(crate) source: String,
    pub(crate) destination: String,
    /// Name of the destination input wire.
    pub(crate) label: String,
    pub(crate) solder: SolderType,
}

/// Everything built against one model.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) schedulers: Mutex<Vec<SchedulerHandle>>,
    input_wires: Mutex<Vec<InputWireRecord>>,
    output_wires: Mutex<Vec<OutputWireRecord>>,
    edges: Mutex<Vec<Edge>>,
}

impl Registry {
    pub(crate) fn record_input_wire(&self, record: InputWireRecord) {
        self.input_wires.lock().push(record);
    }

    pub(crate) fn record_output_wire(&self, record: OutputWireRecord) {
        self.output_wires.lock().push(record);
    }

    pub(crate) fn record_edge(&self, edge: Edge) {
        self.edges.lock().push(edge);
    }

    fn check_bound(&self) -> Result<(), WiringError> {
        match self.input_wires.lock().iter().find(|r| !(r.is_bound)()) {
            Some(record) => Err(WiringError::UnboundInputWire {
                scheduler: record.scheduler.clone(),
                wire: record.wire.clone(),
            }),
            None => Ok(()),
        }
    }

    fn warn_unsoldered(&self) {
        for record in self.output_wires.lock().iter() {
            if record.destinations.load(Ordering::Relaxed) == 0 {
                warn!(
                    scheduler = %record.owner,
                    wire = %record.wire,
                    "Output wire has no destination, its data will be discarded"
                );
            }
        }
    }

    /// Depth-first search for a loop of `Standard` connections.
    fn check_cycles(&self) -> Result<(), WiringError> {
        let mut graph: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let edges = self.edges.lock();
        for edge in edges.iter().filter(|e| e.solder == SolderType::Standard) {
            graph
                .entry(edge.source.as_str())
                .or_default()
                .insert(edge.destination.as_str());
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            node: &'a str,
            graph: &BTreeMap<&'a str, BTreeSet<&'a str>>,
            marks: &mut BTreeMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Option<String> {
            match marks.get(node) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == node).unwrap_or(0);
                    let mut cycle: Vec<&str> = path[start..].to_vec();
                    cycle.push(node);
                    return Some(cycle.join(" -> "));
                }
                None => {}
            }
            marks.insert(node, Mark::Visiting);
            path.push(node);
            for next in graph.get(node).into_iter().flatten() {
                if let Some(cycle) = visit(next, graph, marks, path) {
                    return Some(cycle);
                }
            }
            path.pop();
            marks.insert(node, Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        for node in graph.keys() {
            let mut path = Vec::new();
            if let Some(cycle) = visit(node, &graph, &mut marks, &mut path) {
                return Err(WiringError::CyclicalBackpressure(cycle));
            }
        }
        Ok(())
    }

    /// Mermaid flowchart of every scheduler and solder connection.
    fn diagram(&self) -> String {
        let mut chart = String::from("flowchart LR\n");
        for scheduler in self.schedulers.lock().iter() {
            let name = scheduler.name();
            let (open, close) = match scheduler.scheduler_type() {
                TaskSchedulerType::Concurrent => ("[[", "]]"),
                TaskSchedulerType::Direct => ("[/", "/]"),
                TaskSchedulerType::DirectThreadsafe => ("{{", "}}"),
                TaskSchedulerType::Sequential | TaskSchedulerType::SequentialThread => {
                    ("[", "]")
                }
            };
            let _ = writeln!(chart, "    {name}{open}\"{name}\"{close}");
        }

        let mut drawn = HashSet::new();
        for edge in self.edges.lock().iter() {
            if edge.source == edge.destination
                || !drawn.insert((&edge.source, &edge.destination, &edge.label, edge.solder))
            {
                continue;
            }
            let (open, close) = match edge.solder {
                SolderType::Standard => ("--", "-->"),
                SolderType::Inject => ("-.", ".->"),
                SolderType::Offer => ("--", "--o"),
            };
            let _ = writeln!(
                chart,
                "    {} {open} \"{}\" {close} {}",
                edge.source, edge.label, edge.destination
            );
        }
        chart
    }
}

// =============================================================================
// HEARTBEATS
// =============================================================================

struct Heartbeat {
    period: Duration,
    output: OutputWire<Instant>,
}

/// Stop flag shared with heartbeat threads.
#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
}

fn run_heartbeat(heartbeat: Heartbeat, signal: Arc<StopSignal>) {
    let mut stopped = signal.stopped.lock();
    while !*stopped {
        signal.changed.wait_for(&mut stopped, heartbeat.period);
        if *stopped {
            break;
        }
        MutexGuard::unlocked(&mut stopped, || heartbeat.output.forward(Instant::now()));
    }
}

// =============================================================================
// MODEL
// =============================================================================

/// Owner of the worker pool and registry of all schedulers and wires.
pub struct WiringModel {
    pool: Arc<ThreadPool>,
    registry: Arc<Registry>,
    heartbeats: Mutex<Vec<Heartbeat>>,
    heartbeat_threads: Mutex<Vec<JoinHandle<()>>>,
    stop_signal: Arc<StopSignal>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl WiringModel {
    /// Create a model with a shared pool of `worker_threads` threads
    /// (0 = available parallelism).
    pub fn new(worker_threads: usize) -> Result<Self, WiringError> {
        let threads = match worker_threads {
            0 => thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("wiring-pool-{i}"))
            .build()
            .map_err(|e| WiringError::PoolBuild(e.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
            registry: Arc::new(Registry::default()),
            heartbeats: Mutex::new(Vec::new()),
            heartbeat_threads: Mutex::new(Vec::new()),
            stop_signal: Arc::new(StopSignal::default()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Start building a scheduler.
    pub fn scheduler_builder(&self, name: impl Into<String>) -> TaskSchedulerBuilder {
        TaskSchedulerBuilder::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.pool),
            name.into(),
        )
    }

    /// A wire that emits the current instant every `period` once started.
    ///
    /// Solder heartbeats with [`SolderType::Offer`] so a busy destination
    /// simply misses beats.
    pub fn build_heartbeat_wire(&self, period: Duration) -> OutputWire<Instant> {
        let name = format!("heartbeat_{}ms", period.as_millis());
        let output = OutputWire::new(Arc::clone(&self.registry), &name, "heartbeat", true);
        self.heartbeats.lock().push(Heartbeat {
            period,
            output: output.clone(),
        });
        output
    }

    /// Validate the wiring and start heartbeats.
    pub fn start(&self) -> Result<(), WiringError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(WiringError::Stopped);
        }
        if self.started.load(Ordering::Acquire) {
            return Err(WiringError::AlreadyStarted);
        }
        self.registry.check_bound()?;
        self.registry.check_cycles()?;
        self.registry.warn_unsoldered();

        let mut threads = self.heartbeat_threads.lock();
        for heartbeat in self.heartbeats.lock().drain(..) {
            let signal = Arc::clone(&self.stop_signal);
            let handle = thread::Builder::new()
                .name("wiring-heartbeat".to_string())
                .spawn(move || run_heartbeat(heartbeat, signal))
                .map_err(|_| WiringError::ThreadSpawn("heartbeat".to_string()))?;
            threads.push(handle);
        }

        self.started.store(true, Ordering::Release);
        info!(
            schedulers = self.registry.schedulers.lock().len(),
            heartbeats = threads.len(),
            "Wiring model started"
        );
        Ok(())
    }

    /// Stop heartbeats and dedicated scheduler threads. Idempotent and
    /// final: `start()` fails afterwards.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        *self.stop_signal.stopped.lock() = true;
        self.stop_signal.changed.notify_all();
        for handle in self.heartbeat_threads.lock().drain(..) {
            let _ = handle.join();
        }
        for scheduler in self.registry.schedulers.lock().iter() {
            scheduler.core.shutdown();
        }
        if self.started.swap(false, Ordering::AcqRel) {
            info!("Wiring model stopped");
        }
    }

    /// True between `start()` and `stop()`.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Look up a scheduler by name.
    #[must_use]
    pub fn scheduler(&self, name: &str) -> Option<SchedulerHandle> {
        self.registry
            .schedulers
            .lock()
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    /// Mermaid flowchart of the model. Blocking (`Standard`) connections are
    /// solid arrows, `Inject` connections dotted and `Offer` connections end
    /// in a circle. Each edge is labelled with its destination input wire.
    #[must_use]
    pub fn diagram(&self) -> String {
        self.registry.diagram()
    }

    /// Unprocessed count of every scheduler, in build order.
    #[must_use]
    pub fn unprocessed_counts(&self) -> Vec<(String, usize)> {
        self.registry
            .schedulers
            .lock()
            .iter()
            .map(|s| (s.name().to_string(), s.unprocessed_count()))
            .collect()
    }
}

impl Drop for WiringModel {
    fn drop(&mut self) {
        self.stop();
    }
}
