//! Task results keyed by task id, retained for a fixed TTL.
//!
//! Lookups combine three sources: stored results, the in-flight set (tasks
//! drained into a batch that hasn't returned), and the pending queue.
//! Expired results are dropped lazily, so polling an evicted id reports
//! `NotFound`.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::model::{PendingState, ResultLookup, Task, TaskId, TaskResult};
use crate::queue::TaskQueue;

#[derive(Default)]
struct Inner {
    results: HashMap<TaskId, (TaskResult, Instant)>,
    in_flight: HashSet<TaskId>,
}

pub struct ResultStore {
    inner: Mutex<Inner>,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record tasks as handed to the scheduler.
    pub fn mark_in_flight(&self, tasks: &[Task]) {
        let mut inner = self.lock();
        inner.in_flight.extend(tasks.iter().map(|t| t.id));
    }

    /// Store or overwrite the result for `result.task_id`.
    pub fn put(&self, result: TaskResult) {
        let mut inner = self.lock();
        inner.in_flight.remove(&result.task_id);
        inner.results.insert(result.task_id, (result, Instant::now()));
    }

    /// Stored result if present and not expired.
    pub fn get(&self, id: TaskId) -> Option<TaskResult> {
        let mut inner = self.lock();
        let expired = match inner.results.get(&id) {
            Some((_, stored_at)) => stored_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            inner.results.remove(&id);
            return None;
        }
        inner.results.get(&id).map(|(r, _)| r.clone())
    }

    fn settled(&self, id: TaskId) -> Option<ResultLookup> {
        if let Some(result) = self.get(id) {
            return Some(ResultLookup::Ready(result));
        }
        self.lock()
            .in_flight
            .contains(&id)
            .then_some(ResultLookup::Pending(PendingState::InFlight))
    }

    /// Three-way lookup against this store and the pending queue.
    pub fn lookup(&self, id: TaskId, queue: &TaskQueue) -> ResultLookup {
        if let Some(found) = self.settled(id) {
            return found;
        }
        if let Some(position) = queue.position(id) {
            return ResultLookup::Pending(PendingState::Queued { position });
        }
        // Drained between the two checks above: the drain marks it in flight
        // before releasing the queue lock, so a second look settles it.
        self.settled(id).unwrap_or(ResultLookup::NotFound)
    }

    /// Drop expired results. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut inner = self.lock();
        let before = inner.results.len();
        inner.results.retain(|_, (_, stored_at)| stored_at.elapsed() < ttl);
        before - inner.results.len()
    }

    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }
}
