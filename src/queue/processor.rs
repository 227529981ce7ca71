//! Item Processor Trait
//!
//! The handler bound to a queue at construction. Any async closure returning
//! `anyhow::Result<()>` is a processor, so most callers never implement the
//! trait by hand.

use async_trait::async_trait;
use std::future::Future;

/// Asynchronous per-item handler invoked by the drain loop
#[async_trait]
pub trait ItemProcessor<T>: Send + Sync {
    /// Process a single item. Errors are reported through the queue's
    /// failure policy; they never escape the drain loop.
    async fn process(&self, item: T) -> anyhow::Result<()>;
}

#[async_trait]
impl<T, F, Fut> ItemProcessor<T> for F
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn process(&self, item: T) -> anyhow::Result<()> {
        (self)(item).await
    }
}
