//! Queue Event Notification System
//!
//! Drain lifecycle events broadcast to any number of observers using tokio's
//! broadcast channel. Emission is best effort: a queue with no subscribers
//! is the normal case and never an error.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default broadcast channel capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events emitted by a sequential queue as it drains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueueEvent {
    /// A drain loop took ownership of the queue (Idle -> Running)
    DrainStarted {
        queue: String,
        pending: usize,
        timestamp: u64,
    },

    /// The handler settled successfully for one item
    ItemProcessed {
        queue: String,
        sequence: u64,
        remaining: usize,
        timestamp: u64,
    },

    /// The handler failed or panicked for one item
    ItemFailed {
        queue: String,
        sequence: u64,
        error: String,
        timestamp: u64,
    },

    /// The queue ran dry and returned to Idle
    QueueDrained {
        queue: String,
        processed: u64,
        failed: u64,
        timestamp: u64,
    },

    /// A failure stopped the drain with items still pending
    DrainHalted {
        queue: String,
        sequence: u64,
        pending: usize,
        timestamp: u64,
    },

    /// A drain future was dropped mid-item; `restarted` if a new loop took over
    DrainCancelled {
        queue: String,
        pending: usize,
        restarted: bool,
        timestamp: u64,
    },
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl QueueEvent {
    /// Get the queue name associated with this event
    pub fn queue(&self) -> &str {
        match self {
            QueueEvent::DrainStarted { queue, .. } => queue,
            QueueEvent::ItemProcessed { queue, .. } => queue,
            QueueEvent::ItemFailed { queue, .. } => queue,
            QueueEvent::QueueDrained { queue, .. } => queue,
            QueueEvent::DrainHalted { queue, .. } => queue,
            QueueEvent::DrainCancelled { queue, .. } => queue,
        }
    }

    /// Get the timestamp of this event (milliseconds since the epoch)
    pub fn timestamp(&self) -> u64 {
        match self {
            QueueEvent::DrainStarted { timestamp, .. } => *timestamp,
            QueueEvent::ItemProcessed { timestamp, .. } => *timestamp,
            QueueEvent::ItemFailed { timestamp, .. } => *timestamp,
            QueueEvent::QueueDrained { timestamp, .. } => *timestamp,
            QueueEvent::DrainHalted { timestamp, .. } => *timestamp,
            QueueEvent::DrainCancelled { timestamp, .. } => *timestamp,
        }
    }

    /// True for the events that end a drain loop
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueEvent::QueueDrained { .. } | QueueEvent::DrainHalted { .. } | QueueEvent::DrainCancelled { .. }
        )
    }

    pub fn drain_started(queue: String, pending: usize) -> Self {
        Self::DrainStarted { queue, pending, timestamp: now_millis() }
    }

    pub fn item_processed(queue: String, sequence: u64, remaining: usize) -> Self {
        Self::ItemProcessed { queue, sequence, remaining, timestamp: now_millis() }
    }

    pub fn item_failed(queue: String, sequence: u64, error: String) -> Self {
        Self::ItemFailed { queue, sequence, error, timestamp: now_millis() }
    }

    pub fn queue_drained(queue: String, processed: u64, failed: u64) -> Self {
        Self::QueueDrained { queue, processed, failed, timestamp: now_millis() }
    }

    pub fn drain_halted(queue: String, sequence: u64, pending: usize) -> Self {
        Self::DrainHalted { queue, sequence, pending, timestamp: now_millis() }
    }

    pub fn drain_cancelled(queue: String, pending: usize, restarted: bool) -> Self {
        Self::DrainCancelled { queue, pending, restarted, timestamp: now_millis() }
    }
}

/// Broadcast sender wrapper shared by all clones of a queue
#[derive(Debug, Clone)]
pub struct QueueEventNotifier {
    sender: broadcast::Sender<QueueEvent>,
}

impl QueueEventNotifier {
    pub fn new(capacity: usize) -> Self {
        // broadcast::channel panics on zero capacity
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.sender.subscribe()
    }

    /// Emit an event; returns the number of subscribers that received it
    pub fn emit(&self, event: QueueEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }
}
