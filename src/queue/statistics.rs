//! Queue Statistics
//!
//! Monotonic counters for the life of a queue plus timing of the current or
//! most recent drain loop.

use std::time::{Duration, Instant};

/// Snapshot of a queue's counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStatistics {
    /// Items waiting to be dequeued
    pub pending: usize,

    /// Total items ever enqueued
    pub total_enqueued: u64,

    /// Items whose handler settled successfully
    pub processed: u64,

    /// Items whose handler failed or panicked
    pub failed: u64,

    /// Number of Idle -> Running transitions
    pub drains_started: u64,

    /// Timing of the current or last drain
    pub last_drain: Option<DrainTiming>,
}

impl QueueStatistics {
    /// Items taken off the queue and handed to the handler
    pub fn dispatched(&self) -> u64 {
        self.processed + self.failed
    }
}

/// Start/end of a single drain loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrainTiming {
    pub started: Instant,
    pub finished: Option<Instant>,
}

impl DrainTiming {
    pub fn start() -> Self {
        Self { started: Instant::now(), finished: None }
    }

    pub fn finish(&mut self) {
        self.finished = Some(Instant::now());
    }

    pub fn duration(&self) -> Duration {
        match self.finished {
            Some(end) => end.duration_since(self.started),
            None => Instant::now().duration_since(self.started),
        }
    }
}
