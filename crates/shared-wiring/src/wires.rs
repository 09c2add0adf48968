//! # Wires
//!
//! Typed connection points between schedulers.
//!
//! ```text
//!   scheduler A                                   scheduler B
//!  ┌───────────┐   solder_to(Standard|Inject|Offer) ┌───────────┐
//!  │  handler  │──► OutputWire<T> ─────────────────►│ InputWire │──► handler
//!  └───────────┘        │                           └───────────┘
//!                       ├─ build_transformer(T -> U)
//!                       ├─ build_filter(&T -> bool)
//!                       └─ build_splitter (Vec<T> -> T)
//! ```
//!
//! Transformers, filters and splitters run inline on the thread that
//! produced the value. A value delivered to several destinations is cloned
//! for all but the last.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::error;

use crate::errors::WiringError;
use crate::model::{Edge, OutputWireRecord, Registry};
use crate::scheduler::{type_description, SchedulerCore};

type Handler<IN> = Arc<dyn Fn(IN) + Send + Sync>;
type Forwarder<T> = Arc<dyn Fn(T) + Send + Sync>;

/// How an output wire delivers into an input wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolderType {
    /// Block the producer while the destination is at capacity.
    Standard,
    /// Bypass the destination's capacity. Never blocks.
    Inject,
    /// Drop the item if the destination is at capacity. Never blocks.
    Offer,
}

// =============================================================================
// INPUT WIRES
// =============================================================================

/// Entry point into a scheduler.
///
/// Clones share the wire's handler and squelch flag.
pub struct InputWire<IN> {
    scheduler: Arc<SchedulerCore>,
    name: Arc<str>,
    handler: Arc<OnceLock<Handler<IN>>>,
    squelched: Arc<AtomicBool>,
    describer: Option<fn(&IN) -> String>,
}

impl<IN> Clone for InputWire<IN> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            name: Arc::clone(&self.name),
            handler: Arc::clone(&self.handler),
            squelched: Arc::clone(&self.squelched),
            describer: self.describer,
        }
    }
}

impl<IN: Send + 'static> InputWire<IN> {
    pub(crate) fn new(
        scheduler: Arc<SchedulerCore>,
        name: &str,
        handler: Arc<OnceLock<Handler<IN>>>,
    ) -> Self {
        Self {
            scheduler,
            name: Arc::from(name),
            handler,
            squelched: Arc::new(AtomicBool::new(false)),
            describer: None,
        }
    }

    /// Wire name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the scheduler this wire feeds.
    #[must_use]
    pub fn scheduler_name(&self) -> &str {
        self.scheduler.name()
    }

    /// Discard this wire's tasks when they reach execution. Other inputs of
    /// the scheduler are unaffected. Requires a squelchable scheduler.
    pub fn start_squelching(&self) -> Result<(), WiringError> {
        self.scheduler.set_squelched(&self.squelched, true)
    }

    /// Resume running this wire's tasks.
    pub fn stop_squelching(&self) -> Result<(), WiringError> {
        self.scheduler.set_squelched(&self.squelched, false)
    }

    /// Submit with backpressure: blocks while the scheduler is at capacity.
    pub fn put(&self, item: IN) {
        self.scheduler.on_ramp.on_ramp();
        self.dispatch(item);
    }

    /// Submit ignoring capacity. Never blocks.
    pub fn inject(&self, item: IN) {
        self.scheduler.on_ramp.force_on_ramp();
        self.dispatch(item);
    }

    /// Submit only if there is room. Returns false if the item was dropped.
    pub fn offer(&self, item: IN) -> bool {
        if !self.scheduler.on_ramp.attempt_on_ramp() {
            return false;
        }
        self.dispatch(item);
        true
    }

    fn dispatch(&self, item: IN) {
        let description = match self.describer {
            Some(describe) => Cow::Owned(describe(&item)),
            None => type_description::<IN>(),
        };
        let handler = self.handler.get().cloned();
        let scheduler = Arc::clone(&self.scheduler);
        let wire = Arc::clone(&self.name);
        let task = self.scheduler.wrap(
            Arc::clone(&self.name),
            Arc::clone(&self.squelched),
            description,
            move || match handler {
                Some(handler) => handler(item),
                None => error!(
                    scheduler = %scheduler.name(),
                    wire = %wire,
                    "Input wire not bound, item dropped"
                ),
            },
        );
        self.scheduler.execute(task);
    }
}

/// An input wire that still accepts a handler.
pub struct BindableInputWire<IN, OUT> {
    wire: InputWire<IN>,
    output: OutputWire<OUT>,
}

impl<IN: Send + 'static, OUT: Clone + Send + 'static> BindableInputWire<IN, OUT> {
    pub(crate) fn new(wire: InputWire<IN>, output: OutputWire<OUT>) -> Self {
        Self { wire, output }
    }

    /// Render items in panic logs. Set before taking `input_wire()` copies.
    #[must_use]
    pub fn with_describer(mut self, describer: fn(&IN) -> String) -> Self {
        self.wire.describer = Some(describer);
        self
    }

    /// Bind a handler whose `Some` results go to the scheduler's output wire.
    pub fn bind<F>(&self, handler: F) -> Result<(), WiringError>
    where
        F: Fn(IN) -> Option<OUT> + Send + Sync + 'static,
    {
        let output = self.output.clone();
        self.set_handler(Arc::new(move |item| {
            if let Some(result) = handler(item) {
                output.forward(result);
            }
        }))
    }

    /// Bind a handler that produces nothing.
    pub fn bind_consumer<F>(&self, handler: F) -> Result<(), WiringError>
    where
        F: Fn(IN) + Send + Sync + 'static,
    {
        self.set_handler(Arc::new(handler))
    }

    fn set_handler(&self, handler: Handler<IN>) -> Result<(), WiringError> {
        self.wire
            .handler
            .set(handler)
            .map_err(|_| WiringError::HandlerAlreadyBound {
                scheduler: self.wire.scheduler_name().to_string(),
                wire: self.wire.name().to_string(),
            })
    }

    /// A submit-side handle to this wire.
    #[must_use]
    pub fn input_wire(&self) -> InputWire<IN> {
        self.wire.clone()
    }
}

// =============================================================================
// OUTPUT WIRES
// =============================================================================

struct OutputInner<T> {
    owner: String,
    name: String,
    forwarders: RwLock<Vec<Forwarder<T>>>,
    destinations: Arc<AtomicUsize>,
    registry: Arc<Registry>,
}

/// Values produced by a scheduler (or derived from another output wire).
pub struct OutputWire<T> {
    inner: Arc<OutputInner<T>>,
}

impl<T> Clone for OutputWire<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> OutputWire<T> {
    pub(crate) fn new(registry: Arc<Registry>, owner: &str, name: &str, record: bool) -> Self {
        let destinations = Arc::new(AtomicUsize::new(0));
        if record {
            registry.record_output_wire(OutputWireRecord {
                owner: owner.to_string(),
                wire: name.to_string(),
                destinations: Arc::clone(&destinations),
            });
        }
        Self {
            inner: Arc::new(OutputInner {
                owner: owner.to_string(),
                name: name.to_string(),
                forwarders: RwLock::new(Vec::new()),
                destinations,
                registry,
            }),
        }
    }

    /// Wire name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn add_forwarder(&self, forwarder: Forwarder<T>) {
        self.inner.forwarders.write().push(forwarder);
        self.inner.destinations.fetch_add(1, Ordering::Relaxed);
    }

    fn derive<U: Clone + Send + 'static>(&self, name: &str) -> OutputWire<U> {
        OutputWire::new(Arc::clone(&self.inner.registry), &self.inner.owner, name, true)
    }

    /// Deliver one value to every destination.
    pub(crate) fn forward(&self, item: T) {
        let forwarders = self.inner.forwarders.read().clone();
        if let Some((last, rest)) = forwarders.split_last() {
            for forwarder in rest {
                forwarder(item.clone());
            }
            last(item);
        }
    }

    /// Connect to an input wire.
    pub fn solder_to(&self, input: &InputWire<T>, solder: SolderType) {
        self.inner.registry.record_edge(Edge {
            source: self.inner.owner.clone(),
            destination: input.scheduler_name().to_string(),
            label: input.name().to_string(),
            solder,
        });
        let input = input.clone();
        let forwarder: Forwarder<T> = match solder {
            SolderType::Standard => Arc::new(move |item| input.put(item)),
            SolderType::Inject => Arc::new(move |item| input.inject(item)),
            SolderType::Offer => Arc::new(move |item| {
                input.offer(item);
            }),
        };
        self.add_forwarder(forwarder);
    }

    /// Connect to a plain function, run inline on the producing thread.
    pub fn solder_to_consumer<F>(&self, name: &str, consumer: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        tracing::trace!(owner = %self.inner.owner, wire = %self.inner.name, consumer = %name, "Soldered consumer");
        self.add_forwarder(Arc::new(consumer));
    }

    /// A wire carrying `transform(value)` for every value on this wire.
    pub fn build_transformer<U, F>(&self, name: &str, transform: F) -> OutputWire<U>
    where
        U: Clone + Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let derived = self.derive::<U>(name);
        let target = derived.clone();
        self.add_forwarder(Arc::new(move |item| target.forward(transform(item))));
        derived
    }

    /// A wire carrying only the values for which `predicate` holds.
    ///
    /// Rejected values are dropped on the producing thread, which releases
    /// anything they own.
    pub fn build_filter<F>(&self, name: &str, predicate: F) -> OutputWire<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let derived = self.derive::<T>(name);
        let target = derived.clone();
        self.add_forwarder(Arc::new(move |item| {
            if predicate(&item) {
                target.forward(item);
            } else {
                drop(item);
            }
        }));
        derived
    }
}

impl<T: Clone + Send + 'static> OutputWire<Vec<T>> {
    /// A wire carrying each element of every batch, in order.
    pub fn build_splitter(&self, name: &str) -> OutputWire<T> {
        let derived = self.derive::<T>(name);
        let target = derived.clone();
        self.add_forwarder(Arc::new(move |batch: Vec<T>| {
            for item in batch {
                target.forward(item);
            }
        }));
        derived
    }
}
