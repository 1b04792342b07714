//! Batch service: the public API for submitting tasks and collecting results.
//!
//! The service owns the queue, budget, result store and event log, and the
//! scheduler that ties them to the upstream model. It is an explicitly
//! constructed object with a `start()`/`stop()` lifecycle; nothing is global,
//! so tests run isolated instances side by side.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::budget::BudgetGuard;
use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind, EventLog};
use crate::llm::Upstream;
use crate::model::{Priority, ResultLookup, Task, TaskId, TaskKind, TaskResult, UsageStats};
use crate::queue::TaskQueue;
use crate::results::ResultStore;
use crate::telemetry::metrics;

use super::scheduler::{BatchReport, BatchScheduler};

pub struct BatchService {
    queue: Arc<TaskQueue>,
    budget: Arc<BudgetGuard>,
    results: Arc<ResultStore>,
    events: Arc<EventLog>,
    scheduler: Arc<BatchScheduler>,
    config: BatchConfig,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BatchService {
    pub fn new(config: BatchConfig, upstream: Arc<dyn Upstream>) -> Self {
        let budget = BudgetGuard::new(config.daily_token_limit, config.daily_cost_limit);
        Self::with_budget(config, upstream, budget)
    }

    /// Service over an existing budget guard, e.g. one whose day started earlier.
    pub fn with_budget(
        config: BatchConfig,
        upstream: Arc<dyn Upstream>,
        budget: BudgetGuard,
    ) -> Self {
        let queue = Arc::new(TaskQueue::new(config.queue_capacity));
        let budget = Arc::new(budget);
        let results = Arc::new(ResultStore::new(config.result_ttl()));
        let events = Arc::new(EventLog::new());
        let scheduler = Arc::new(BatchScheduler::new(
            Arc::clone(&queue),
            Arc::clone(&budget),
            Arc::clone(&results),
            Arc::clone(&events),
            upstream,
            &config,
        ));
        Self {
            queue,
            budget,
            results,
            events,
            scheduler,
            config,
            handle: Mutex::new(None),
        }
    }

    /// Spawn the scheduler loop. Calling it again while running is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let scheduler = Arc::clone(&self.scheduler);
        *handle = Some(tokio::spawn(async move { scheduler.run().await }));
        info!("batch service started");
    }

    /// Stop the scheduler loop and wait for it to exit. Queued tasks stay
    /// queued and can still be flushed by hand; the loop can't be restarted.
    pub async fn stop(&self) {
        self.scheduler.shutdown();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!(pending = self.queue.size(), "batch service stopped");
    }

    /// Admit a task. A high-priority task arriving when `burst_threshold`
    /// tasks are pending (itself included) wakes the scheduler early.
    ///
    /// # Errors
    /// [`Error::QueueFull`] when the queue is at capacity.
    pub fn enqueue_task(
        &self,
        kind: TaskKind,
        content: impl Into<String>,
        priority: Priority,
    ) -> Result<TaskId> {
        let task = Task::new(kind, content, priority);
        let id = task.id;
        let queue_size = self.queue.enqueue(task)?;

        debug!(%id, %kind, %priority, queue_size, "task enqueued");
        self.events.record(EventKind::TaskEnqueued {
            id,
            kind,
            priority,
            queue_size,
        });
        metrics::tasks_enqueued().add(
            1,
            &[
                KeyValue::new("kind", kind.as_str()),
                KeyValue::new("priority", priority.to_string()),
            ],
        );

        if priority == Priority::High && queue_size >= self.config.burst_threshold {
            info!(queue_size, "high-priority burst, flushing early");
            self.events.record(EventKind::BurstTriggered { queue_size });
            self.scheduler.wake();
        }
        Ok(id)
    }

    /// Ready result, pending state (with queue position), or not found.
    pub fn get_task_result(&self, id: TaskId) -> ResultLookup {
        self.results.lookup(id, &self.queue)
    }

    /// Wait for a task's result, polling every `poll_interval`.
    ///
    /// # Errors
    /// - [`Error::PollTimedOut`] if `timeout` elapses first
    /// - [`Error::NotFound`] if the id is neither queued, in flight nor resulted
    /// - [`Error::Cancelled`] if `cancel` fires
    pub async fn wait_for_result(
        &self,
        id: TaskId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TaskResult> {
        let poll_interval = self.config.poll_interval();
        let poll = async {
            loop {
                match self.get_task_result(id) {
                    ResultLookup::Ready(result) => return Ok(result),
                    ResultLookup::NotFound => return Err(Error::NotFound(id.to_string())),
                    ResultLookup::Pending(_) => {}
                }
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .unwrap_or_else(|_| {
                Err(Error::PollTimedOut {
                    task_id: id.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                })
            })
    }

    /// [`wait_for_result`](Self::wait_for_result) with the configured poll timeout.
    pub async fn await_result(&self, id: TaskId) -> Result<TaskResult> {
        self.wait_for_result(id, self.config.poll_timeout(), &CancellationToken::new())
            .await
    }

    /// Take a task back out of the queue, e.g. after the caller stopped
    /// waiting for it. Returns false once the task has been drained.
    pub fn withdraw(&self, id: TaskId) -> bool {
        let removed = self.queue.remove(id);
        if removed {
            debug!(%id, "task withdrawn");
            self.events.record(EventKind::TaskWithdrawn { task_id: id });
        }
        removed
    }

    /// Run one batch now, outside the timer.
    pub async fn flush(&self) -> Result<BatchReport> {
        self.scheduler.run_batch().await
    }

    pub fn usage_stats(&self) -> UsageStats {
        if self.budget.reset_if_new_day() {
            self.events.record(EventKind::BudgetReset);
        }
        let budget = self.budget.snapshot();
        UsageStats {
            queue_size: self.queue.size(),
            tokens_used_today: budget.tokens_used_today,
            daily_token_limit: self.budget.daily_token_limit(),
            daily_cost_used: budget.cost_used_today,
            daily_cost_limit: self.budget.daily_cost_limit(),
        }
    }

    pub fn events_since(&self, since_seq: u64) -> Vec<Event> {
        self.events.since(since_seq)
    }

    pub(crate) fn record_event(&self, kind: EventKind) -> u64 {
        self.events.record(kind)
    }

    pub fn budget(&self) -> &BudgetGuard {
        &self.budget
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

impl Drop for BatchService {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}
