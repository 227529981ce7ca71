//! Idle -> Running -> Idle lifecycle

use crate::queue::{DrainState, FailurePolicy, QueueConfig, QueueError, QueueEvent, SequentialQueue};
use parking_lot::Mutex;
use std::sync::Arc;

fn collecting_queue(config: QueueConfig) -> (SequentialQueue<String>, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let queue = SequentialQueue::with_config(config, move |item: String| {
        let sink = Arc::clone(&sink);
        async move {
            if item.is_empty() {
                anyhow::bail!("empty item");
            }
            sink.lock().push(item);
            Ok(())
        }
    })
    .unwrap();
    (queue, log)
}

fn drain_events(events: &mut tokio::sync::broadcast::Receiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn test_new_queue_is_idle_and_empty() {
    let (queue, _) = collecting_queue(QueueConfig::default());
    assert_eq!(queue.size(), 0);
    assert!(queue.is_empty());
    assert!(!queue.is_processing());
    assert_eq!(queue.dequeue(), None);
    assert_eq!(queue.peek(), None);

    // Waiting on an idle queue returns straight away
    queue.wait_for_drain().await;
}

#[tokio::test]
async fn test_drain_restarts_after_going_idle() {
    let (queue, log) = collecting_queue(QueueConfig::named("restart"));

    queue.enqueue("a".to_string());
    queue.wait_for_drain().await;
    assert_eq!(queue.state(), DrainState::Idle);
    assert_eq!(queue.statistics().drains_started, 1);

    // Stays idle with nothing to do
    tokio::task::yield_now().await;
    assert_eq!(queue.state(), DrainState::Idle);

    queue.enqueue("b".to_string());
    assert_eq!(queue.state(), DrainState::Running);
    queue.wait_for_drain().await;

    assert_eq!(*log.lock(), vec!["a".to_string(), "b".to_string()]);
    let stats = queue.statistics();
    assert_eq!(stats.drains_started, 2);
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.pending, 0);
    assert!(stats.last_drain.and_then(|timing| timing.finished).is_some());
}

#[tokio::test]
async fn test_event_sequence_for_one_drain() {
    let (queue, _) = collecting_queue(QueueConfig::named("events"));
    let mut events = queue.subscribe_events();

    queue.enqueue("x".to_string());
    queue.enqueue(String::new());
    queue.enqueue("z".to_string());
    queue.wait_for_drain().await;

    let events = drain_events(&mut events);
    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], QueueEvent::DrainStarted { pending: 3, .. }));
    assert!(matches!(events[1], QueueEvent::ItemProcessed { sequence: 0, remaining: 2, .. }));
    assert!(matches!(events[2], QueueEvent::ItemFailed { sequence: 1, .. }));
    assert!(matches!(events[3], QueueEvent::ItemProcessed { sequence: 2, remaining: 0, .. }));
    assert!(matches!(events[4], QueueEvent::QueueDrained { processed: 2, failed: 1, .. }));
    assert!(events.iter().all(|event| event.queue() == "events"));
}

#[tokio::test]
async fn test_run_reports_failures() {
    let (queue, log) = collecting_queue(QueueConfig::default().with_failure_policy(FailurePolicy::Halt));

    // Halting on the first item leaves the rest for an explicit run
    queue.enqueue(String::new());
    queue.enqueue("kept".to_string());
    queue.enqueue(String::new());
    queue.enqueue("after".to_string());
    queue.wait_for_drain().await;
    assert_eq!(queue.size(), 3);

    let report = queue.run().await.unwrap();
    assert!(report.halted);
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed(), 1);
    assert!(matches!(report.failures[0], QueueError::HandlerFailed { sequence: 2, .. }));
    assert_eq!(queue.size(), 1);

    let report = queue.run().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(*log.lock(), vec!["kept".to_string(), "after".to_string()]);
}

#[tokio::test]
async fn test_clones_share_one_queue() {
    let (queue, log) = collecting_queue(QueueConfig::default());
    let producer = queue.clone();

    producer.enqueue("from clone".to_string());
    assert_eq!(queue.size(), 1);
    assert_eq!(queue.peek().as_deref(), Some("from clone"));

    queue.wait_for_drain().await;
    assert!(producer.is_empty());
    assert_eq!(log.lock().len(), 1);
}
