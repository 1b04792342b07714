//! In-memory FIFO of pending tasks.
//!
//! All access goes through one mutex, so a drain running concurrently with
//! enqueues can neither lose nor duplicate a task. The lock is never held
//! across an await point.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{Priority, Task, TaskId};

pub struct TaskQueue {
    inner: Mutex<VecDeque<Task>>,
    capacity: usize,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        // A panic while holding the lock leaves the deque itself intact.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a task to the tail. Returns the pending count after insertion.
    ///
    /// # Errors
    /// [`Error::QueueFull`] when `capacity` tasks are already pending.
    pub fn enqueue(&self, task: Task) -> Result<usize> {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return Err(Error::QueueFull {
                capacity: self.capacity,
            });
        }
        queue.push_back(task);
        Ok(queue.len())
    }

    /// Remove and return up to `max` tasks from the head, in enqueue order.
    pub fn drain(&self, max: usize) -> Vec<Task> {
        self.drain_with(max, |_| {})
    }

    /// Like [`drain`](Self::drain), but runs `on_drained` before the lock is
    /// released so the caller can record the hand-off atomically.
    pub fn drain_with(&self, max: usize, on_drained: impl FnOnce(&[Task])) -> Vec<Task> {
        let mut queue = self.lock();
        let n = max.min(queue.len());
        let tasks: Vec<Task> = queue.drain(..n).collect();
        on_drained(&tasks);
        tasks
    }

    /// Remove a pending task. Returns false if it is not (or no longer) queued.
    pub fn remove(&self, id: TaskId) -> bool {
        let mut queue = self.lock();
        match queue.iter().position(|t| t.id == id) {
            Some(index) => queue.remove(index).is_some(),
            None => false,
        }
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Zero-based position of a pending task, `None` if not queued.
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.lock().iter().position(|t| t.id == id)
    }

    /// True when at least `threshold` tasks are pending and one of them is high priority.
    pub fn burst_ready(&self, threshold: usize) -> bool {
        let queue = self.lock();
        queue.len() >= threshold && queue.iter().any(|t| t.priority == Priority::High)
    }
}
