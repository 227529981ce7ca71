//! Sequential Queue Implementation
//!
//! A FIFO of items processed one at a time by a single handler. Enqueueing
//! onto an idle queue starts a drain loop on the queue's runtime; the loop
//! removes the head item, awaits the handler, and repeats until the queue is
//! empty, at which point the queue goes back to idle.
//!
//! The pending items and the drain state share one lock. The loop's
//! emptiness check and its Running -> Idle transition happen under that
//! lock, as do `enqueue`'s append and Idle -> Running check, so an item can
//! never be appended to a queue whose loop has already decided to stop.

use crate::queue::config::{FailurePolicy, QueueConfig};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::notifications::{QueueEvent, QueueEventNotifier};
use crate::queue::processor::ItemProcessor;
use crate::queue::statistics::{DrainTiming, QueueStatistics};
use futures::FutureExt;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

/// Whether a drain loop currently owns the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// No drain loop is active
    Idle,
    /// A drain loop is removing and processing items
    Running,
}

/// Outcome of one drain loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Items whose handler settled successfully
    pub processed: u64,
    /// One entry per failed or panicked item, in processing order
    pub failures: Vec<QueueError>,
    /// The loop stopped early under `FailurePolicy::Halt`
    pub halted: bool,
}

impl DrainReport {
    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Pending<T> {
    sequence: u64,
    item: T,
}

struct QueueState<T> {
    elements: VecDeque<Pending<T>>,
    drain: DrainState,
    next_sequence: u64,
    stats: QueueStatistics,
}

impl<T> QueueState<T> {
    fn new() -> Self {
        Self {
            elements: VecDeque::new(),
            drain: DrainState::Idle,
            next_sequence: 0,
            stats: QueueStatistics::default(),
        }
    }

    /// Idle -> Running. Returns false if a loop is already active.
    fn begin_drain(&mut self) -> bool {
        match self.drain {
            DrainState::Running => false,
            DrainState::Idle => {
                self.drain = DrainState::Running;
                self.stats.drains_started += 1;
                self.stats.last_drain = Some(DrainTiming::start());
                true
            }
        }
    }

    /// Running -> Idle
    fn finish_drain(&mut self) {
        self.drain = DrainState::Idle;
        if let Some(timing) = self.stats.last_drain.as_mut() {
            timing.finish();
        }
    }
}

struct Shared<T> {
    config: QueueConfig,
    processor: Box<dyn ItemProcessor<T>>,
    state: Mutex<QueueState<T>>,
    notifier: QueueEventNotifier,
    runtime: Handle,
}

/// Sequential async task queue
///
/// Cloning is cheap and every clone refers to the same queue, so any number
/// of producers can hold one.
pub struct SequentialQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SequentialQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for SequentialQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SequentialQueue")
            .field("name", &self.shared.config.name)
            .field("state", &state.drain)
            .field("pending", &state.elements.len())
            .finish()
    }
}

impl<T> SequentialQueue<T>
where
    T: Send + 'static,
{
    /// Create a queue with default configuration on the current runtime
    pub fn new<P>(processor: P) -> QueueResult<Self>
    where
        P: ItemProcessor<T> + 'static,
    {
        Self::with_config(QueueConfig::default(), processor)
    }

    /// Create a queue with the given configuration on the current runtime
    pub fn with_config<P>(config: QueueConfig, processor: P) -> QueueResult<Self>
    where
        P: ItemProcessor<T> + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Ok(Self::with_runtime(runtime, config, processor))
    }

    /// Create a queue whose drain loops are spawned on `runtime`
    pub fn with_runtime<P>(runtime: Handle, config: QueueConfig, processor: P) -> Self
    where
        P: ItemProcessor<T> + 'static,
    {
        debug!("Created queue '{}' ({:?} on failure)", config.name, config.failure_policy);
        Self {
            shared: Arc::new(Shared {
                notifier: QueueEventNotifier::new(config.event_capacity),
                config,
                processor: Box::new(processor),
                state: Mutex::new(QueueState::new()),
                runtime,
            }),
        }
    }

    /// Append an item and start draining if the queue is idle.
    ///
    /// Returns the item's sequence number. The append and the counters in
    /// `statistics()` are updated before this returns; processing happens on
    /// the queue's runtime.
    ///
    /// On a current-thread runtime the new item stays in `size()` until the
    /// caller yields. On a multi-thread runtime a worker may pick it up
    /// immediately, so `size()` can already have dropped by the time this
    /// returns.
    pub fn enqueue(&self, item: T) -> u64 {
        let (sequence, start) = {
            let mut state = self.shared.state.lock();
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.elements.push_back(Pending { sequence, item });
            state.stats.total_enqueued += 1;
            (sequence, state.begin_drain())
        };

        trace!("Enqueued item #{} on queue '{}'", sequence, self.name());
        if start {
            self.spawn_drain();
        }
        sequence
    }

    /// Drain the queue on the calling task.
    ///
    /// Fails with `DrainInProgress` if another loop already owns the queue;
    /// the pending items are left untouched in that case.
    pub async fn run(&self) -> QueueResult<DrainReport> {
        let started = self.shared.state.lock().begin_drain();
        if !started {
            return Err(QueueError::DrainInProgress {
                name: self.name().to_string(),
            });
        }
        Ok(self.drain().await)
    }

    /// Wait until no drain loop is active.
    ///
    /// Returns immediately on an idle queue. After a halted drain the queue
    /// is idle but may still hold pending items.
    pub async fn wait_for_drain(&self) {
        let mut events = self.subscribe_events();
        if !self.is_processing() {
            return;
        }

        loop {
            match events.recv().await {
                Ok(event) if event.is_terminal() => {
                    if !self.is_processing() {
                        return;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!("Drain waiter on '{}' skipped {} events", self.name(), skipped);
                    if !self.is_processing() {
                        return;
                    }
                }
                // The sender lives in `Shared`, which `self` keeps alive
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    fn spawn_drain(&self) {
        let queue = self.clone();
        self.shared.runtime.spawn(async move {
            let report = queue.drain().await;
            if !report.is_clean() {
                debug!(
                    "Background drain of '{}' finished with {} failure(s)",
                    queue.name(),
                    report.failed()
                );
            }
        });
    }

    /// The drain loop. The caller must already have moved the queue to Running.
    async fn drain(&self) -> DrainReport {
        let name = self.name().to_string();
        let mut guard = DrainGuard { queue: self, armed: true };
        let mut report = DrainReport::default();

        let pending = self.size();
        debug!("Queue '{}' drain started with {} pending", name, pending);
        self.shared.notifier.emit(QueueEvent::drain_started(name.clone(), pending));

        let elapsed;
        loop {
            let next = {
                let mut state = self.shared.state.lock();
                match state.elements.pop_front() {
                    Some(next) => next,
                    None => {
                        state.finish_drain();
                        elapsed = state.stats.last_drain.map(|timing| timing.duration()).unwrap_or_default();
                        break;
                    }
                }
            };

            let Pending { sequence, item } = next;
            trace!("Processing item #{} on queue '{}'", sequence, name);

            let outcome = AssertUnwindSafe(self.shared.processor.process(item))
                .catch_unwind()
                .await;

            let error = match outcome {
                Ok(Ok(())) => {
                    let remaining = {
                        let mut state = self.shared.state.lock();
                        state.stats.processed += 1;
                        state.elements.len()
                    };
                    report.processed += 1;
                    self.shared
                        .notifier
                        .emit(QueueEvent::item_processed(name.clone(), sequence, remaining));
                    continue;
                }
                Ok(Err(e)) => QueueError::handler_failed(name.as_str(), sequence, e),
                Err(_) => QueueError::HandlerPanicked {
                    name: name.clone(),
                    sequence,
                },
            };

            warn!("{}", error);
            self.shared.state.lock().stats.failed += 1;
            self.shared
                .notifier
                .emit(QueueEvent::item_failed(name.clone(), sequence, error.to_string()));
            report.failures.push(error);

            if self.shared.config.failure_policy == FailurePolicy::Halt {
                let pending = {
                    let mut state = self.shared.state.lock();
                    state.finish_drain();
                    state.elements.len()
                };
                guard.armed = false;
                report.halted = true;
                info!(
                    "Queue '{}' halted after item #{} failed, {} item(s) left pending",
                    name, sequence, pending
                );
                self.shared
                    .notifier
                    .emit(QueueEvent::drain_halted(name, sequence, pending));
                return report;
            }
        }

        guard.armed = false;
        debug!(
            "Queue '{}' drained in {:?}: {} processed, {} failed",
            name,
            elapsed,
            report.processed,
            report.failed()
        );
        self.shared
            .notifier
            .emit(QueueEvent::queue_drained(name, report.processed, report.failed()));
        report
    }
}

impl<T> SequentialQueue<T> {
    /// Remove and return the head item without processing it
    pub fn dequeue(&self) -> Option<T> {
        self.shared.state.lock().elements.pop_front().map(|pending| pending.item)
    }

    /// Clone of the head item, if any
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.shared.state.lock().elements.front().map(|pending| pending.item.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().elements.is_empty()
    }

    /// Number of items not yet dequeued
    pub fn size(&self) -> usize {
        self.shared.state.lock().elements.len()
    }

    pub fn state(&self) -> DrainState {
        self.shared.state.lock().drain
    }

    pub fn is_processing(&self) -> bool {
        self.state() == DrainState::Running
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    pub fn statistics(&self) -> QueueStatistics {
        let state = self.shared.state.lock();
        QueueStatistics {
            pending: state.elements.len(),
            ..state.stats.clone()
        }
    }

    /// Subscribe to drain events
    pub fn subscribe_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.notifier.subscribe()
    }
}

/// Keeps the queue live if a drain future is dropped mid-item.
///
/// The in-flight item is lost. Remaining items are handed to a fresh loop on
/// the queue's runtime so they are not stranded behind a Running state.
struct DrainGuard<'a, T>
where
    T: Send + 'static,
{
    queue: &'a SequentialQueue<T>,
    armed: bool,
}

impl<T> Drop for DrainGuard<'_, T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let (restart, pending) = {
            let mut state = self.queue.shared.state.lock();
            state.finish_drain();
            let pending = state.elements.len();
            (pending > 0 && state.begin_drain(), pending)
        };

        warn!(
            "Drain of queue '{}' was cancelled{}",
            self.queue.name(),
            if restart { ", restarting in background" } else { "" }
        );
        self.queue.shared.notifier.emit(QueueEvent::drain_cancelled(
            self.queue.name().to_string(),
            pending,
            restart,
        ));
        if restart {
            self.queue.spawn_drain();
        }
    }
}
