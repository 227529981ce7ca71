//! Sequential Task Queue
//!
//! Serializes asynchronous processing of a stream of items through a single
//! handler. At most one handler invocation is in flight per queue, items are
//! handled in enqueue order, and the first `enqueue` on an idle queue starts
//! the drain loop by itself.
//!
//! # Architecture
//!
//! - **SequentialQueue**: the queue and its drain loop
//! - **ItemProcessor**: the per-item handler bound at construction
//! - **QueueEvent**: broadcast notifications of drain progress
//! - **QueueConfig**: name, failure policy and event channel sizing
//!
//! # Usage
//!
//! ```rust
//! use taskline::queue::SequentialQueue;
//!
//! # tokio_test::block_on(async {
//! let queue = SequentialQueue::new(|line: String| async move {
//!     println!("{}", line);
//!     Ok::<(), anyhow::Error>(())
//! })
//! .unwrap();
//!
//! queue.enqueue("first".to_string());
//! queue.enqueue("second".to_string());
//! assert_eq!(queue.size(), 2);
//!
//! queue.wait_for_drain().await;
//! assert!(queue.is_empty());
//! # });
//! ```

pub mod config;
pub mod error;
pub mod notifications;
pub mod processor;
pub mod sequential;
pub mod statistics;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use config::{load_queue_config, save_queue_config, FailurePolicy, QueueConfig};
pub use error::{QueueError, QueueResult};
pub use notifications::{QueueEvent, QueueEventNotifier};
pub use processor::ItemProcessor;
pub use sequential::{DrainReport, DrainState, SequentialQueue};
pub use statistics::{DrainTiming, QueueStatistics};
