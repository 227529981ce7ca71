//! Queue Error Types
//!
//! Defines error types specific to the sequential queue. The queue itself is
//! a transparent sequencer, so most variants describe what happened to a
//! handler invocation rather than to the queue.

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueueError {
    /// Construction attempted outside a tokio runtime
    #[error("No tokio runtime available - queue must be created inside a runtime or given a handle")]
    NoRuntime,

    /// A drain loop already owns the queue
    #[error("Queue '{name}' is already draining")]
    DrainInProgress { name: String },

    /// The handler resolved with an error for one item
    #[error("Handler failed on item #{sequence} in queue '{name}': {message}")]
    HandlerFailed {
        name: String,
        sequence: u64,
        message: String,
    },

    /// The handler panicked while processing one item
    #[error("Handler panicked on item #{sequence} in queue '{name}'")]
    HandlerPanicked { name: String, sequence: u64 },
}

impl QueueError {
    /// Create a handler failure from any displayable error
    pub fn handler_failed(name: impl Into<String>, sequence: u64, error: impl std::fmt::Display) -> Self {
        Self::HandlerFailed {
            name: name.into(),
            sequence,
            // Alternate formatting keeps the anyhow context chain
            message: format!("{:#}", error),
        }
    }

    /// Sequence number of the item this error concerns, if any
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Self::HandlerFailed { sequence, .. } | Self::HandlerPanicked { sequence, .. } => Some(*sequence),
            _ => None,
        }
    }
}
