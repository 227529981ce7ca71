//! Line pipeline used by the `taskline` binary
//!
//! Reads newline-separated items and pushes each onto a sequential queue as
//! soon as it is read, so processing overlaps with input. The handler writes
//! `<line>\t<text>` to the shared output. Blank lines are rejected by the
//! handler, which makes the queue's failure policy visible from the command
//! line. Under `FailurePolicy::Halt` no further lines are read once a drain
//! has halted.

use crate::queue::{FailurePolicy, QueueConfig, SequentialQueue};
use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// One input line and its 1-based position
#[derive(Debug, Clone, PartialEq)]
pub struct InputLine {
    pub number: usize,
    pub text: String,
}

/// Pipeline settings beyond the queue itself
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub queue: QueueConfig,
    /// Artificial per-item latency
    pub delay: Duration,
}

/// Final counts for one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSummary {
    pub read: u64,
    pub processed: u64,
    pub failed: u64,
    /// Left behind by a halted drain
    pub pending: usize,
}

impl PipelineSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.pending == 0
    }
}

impl std::fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read: {} | Processed: {} | Failed: {} | Pending: {}",
            self.read, self.processed, self.failed, self.pending
        )
    }
}

/// Feed every line of `reader` through a sequential queue writing to `output`
pub async fn pipe_lines<R, W>(reader: R, output: Arc<Mutex<W>>, options: PipelineOptions) -> Result<PipelineSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let delay = options.delay;
    let halts = options.queue.failure_policy == FailurePolicy::Halt;
    let sink = Arc::clone(&output);
    let queue = SequentialQueue::with_config(options.queue, move |line: InputLine| {
        let sink = Arc::clone(&sink);
        async move {
            if line.text.trim().is_empty() {
                anyhow::bail!("line {} is blank", line.number);
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut out = sink.lock().await;
            out.write_all(format!("{}\t{}\n", line.number, line.text).as_bytes())
                .await
                .with_context(|| format!("Failed to write line {}", line.number))?;
            Ok(())
        }
    })?;

    let mut lines = reader.lines();
    let mut number = 0;
    while let Some(text) = lines.next_line().await.context("Failed to read input")? {
        if halts && queue.statistics().failed > 0 {
            info!("Queue '{}' halted, ignoring remaining input", queue.name());
            break;
        }
        number += 1;
        queue.enqueue(InputLine { number, text });
    }
    debug!("Read {} line(s) into queue '{}'", number, queue.name());

    queue.wait_for_drain().await;
    output.lock().await.flush().await.context("Failed to flush output")?;

    let stats = queue.statistics();
    let summary = PipelineSummary {
        read: stats.total_enqueued,
        processed: stats.processed,
        failed: stats.failed,
        pending: stats.pending,
    };
    info!("{}", summary);
    Ok(summary)
}
