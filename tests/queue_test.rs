//! Tests for the pending task queue.

use std::collections::HashSet;
use std::sync::Arc;

use freight_ai::error::Error;
use freight_ai::model::{Priority, Task, TaskKind};
use freight_ai::queue::TaskQueue;

fn task(priority: Priority) -> Task {
    Task::new(TaskKind::EmailAnalysis, "check inbox", priority)
}

#[test]
fn drain_returns_head_in_fifo_order() {
    let queue = TaskQueue::new(100);
    let ids: Vec<_> = (0..5)
        .map(|_| {
            let t = task(Priority::Low);
            let id = t.id;
            queue.enqueue(t).unwrap();
            id
        })
        .collect();

    let drained = queue.drain(3);
    assert_eq!(drained.iter().map(|t| t.id).collect::<Vec<_>>(), ids[..3]);
    assert_eq!(queue.size(), 2);

    let rest = queue.drain(10);
    assert_eq!(rest.iter().map(|t| t.id).collect::<Vec<_>>(), ids[3..]);
    assert!(queue.drain(10).is_empty());
}

#[test]
fn enqueue_reports_pending_count_and_positions() {
    let queue = TaskQueue::new(100);
    let first = task(Priority::Low);
    let second = task(Priority::Low);
    let (a, b) = (first.id, second.id);

    assert_eq!(queue.enqueue(first).unwrap(), 1);
    assert_eq!(queue.enqueue(second).unwrap(), 2);
    assert_eq!(queue.position(a), Some(0));
    assert_eq!(queue.position(b), Some(1));

    queue.drain(1);
    assert_eq!(queue.position(a), None);
    assert_eq!(queue.position(b), Some(0));
}

#[test]
fn enqueue_beyond_capacity_is_rejected() {
    let queue = TaskQueue::new(2);
    queue.enqueue(task(Priority::Low)).unwrap();
    queue.enqueue(task(Priority::Low)).unwrap();

    let err = queue.enqueue(task(Priority::High)).unwrap_err();
    assert!(matches!(err, Error::QueueFull { capacity: 2 }));
    assert_eq!(queue.size(), 2);
}

#[test]
fn burst_needs_threshold_and_a_high_priority_task() {
    let queue = TaskQueue::new(100);
    for _ in 0..10 {
        queue.enqueue(task(Priority::Low)).unwrap();
    }
    assert!(!queue.burst_ready(10));

    queue.enqueue(task(Priority::High)).unwrap();
    assert!(queue.burst_ready(10));
    assert!(!queue.burst_ready(12));
}

#[test]
fn concurrent_enqueue_and_drain_lose_nothing() {
    let queue = Arc::new(TaskQueue::new(10_000));
    let producers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                (0..500)
                    .map(|_| {
                        let t = task(Priority::Medium);
                        let id = t.id;
                        queue.enqueue(t).unwrap();
                        id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let drainer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..200 {
                seen.extend(queue.drain(7).into_iter().map(|t| t.id));
                std::thread::yield_now();
            }
            seen
        })
    };

    let enqueued: HashSet<_> = producers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let mut drained = drainer.join().unwrap();
    drained.extend(queue.drain(usize::MAX).into_iter().map(|t| t.id));

    assert_eq!(drained.len(), 2000);
    let unique: HashSet<_> = drained.into_iter().collect();
    assert_eq!(unique.len(), 2000, "a task was drained twice");
    assert_eq!(unique, enqueued);
}
