//! Batch scheduler: drains the queue on a timer or a priority burst, groups
//! tasks by kind, and sends one upstream call per group.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use crate::budget::BudgetGuard;
use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::event::{EventKind, EventLog};
use crate::llm::{Upstream, UpstreamRequest, UpstreamResponse};
use crate::model::{ResultValue, Task, TaskId, TaskKind, TaskResult};
use crate::queue::TaskQueue;
use crate::results::ResultStore;
use crate::telemetry::batch::{record_batch_outcome, start_batch_span};
use crate::telemetry::metrics;

const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// What one `run_batch` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub drained: usize,
    pub partitions: usize,
    pub failed_partitions: usize,
    pub tokens_used: u64,
    pub cost: f64,
}

/// Clears the run-in-progress flag when the run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Partitions dispatched but not yet settled. Whatever is left when the
/// run is dropped (a cancelled `flush()`) gets retryable error results.
struct Unsettled<'a> {
    scheduler: &'a BatchScheduler,
    owners: HashMap<tokio::task::Id, (TaskKind, Vec<TaskId>)>,
}

impl Unsettled<'_> {
    fn take(&mut self, id: tokio::task::Id) -> Option<(TaskKind, Vec<TaskId>)> {
        self.owners.remove(&id)
    }
}

impl Drop for Unsettled<'_> {
    fn drop(&mut self) {
        for (_, (kind, ids)) in self.owners.drain() {
            warn!(%kind, tasks = ids.len(), "batch run dropped before partition settled");
            self.scheduler
                .fail_partition(kind, &ids, "batch run cancelled before the upstream replied");
        }
    }
}

pub struct BatchScheduler {
    queue: Arc<TaskQueue>,
    budget: Arc<BudgetGuard>,
    results: Arc<ResultStore>,
    events: Arc<EventLog>,
    upstream: Arc<dyn Upstream>,
    interval: Duration,
    max_batch_size: usize,
    burst_threshold: usize,
    dispatch_timeout: Duration,
    running: AtomicBool,
    wake: Notify,
    shutdown: CancellationToken,
}

impl BatchScheduler {
    pub fn new(
        queue: Arc<TaskQueue>,
        budget: Arc<BudgetGuard>,
        results: Arc<ResultStore>,
        events: Arc<EventLog>,
        upstream: Arc<dyn Upstream>,
        config: &BatchConfig,
    ) -> Self {
        Self {
            queue,
            budget,
            results,
            events,
            upstream,
            // tokio's interval panics on a zero period.
            interval: config.batch_interval().max(MIN_INTERVAL),
            max_batch_size: config.max_batch_size.max(1),
            burst_threshold: config.burst_threshold,
            dispatch_timeout: config.dispatch_timeout(),
            running: AtomicBool::new(false),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Ask the loop to run a batch now instead of waiting for the interval.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Signal the loop to exit after the current batch.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running_batch(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run until shutdown. Batch errors are logged, never fatal to the loop.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the first timed batch is one interval out.
        ticker.tick().await;

        info!(
            interval_secs = self.interval.as_secs(),
            max_batch_size = self.max_batch_size,
            "batch scheduler started"
        );

        loop {
            let trigger = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("batch scheduler shutting down");
                    return;
                }
                _ = self.wake.notified() => "burst",
                _ = ticker.tick() => "interval",
            };

            let purged = self.results.purge_expired();
            if purged > 0 {
                debug!(purged, "expired results dropped");
            }

            // Keep going while a burst is still pending and each run makes progress.
            loop {
                let drained = self.run_logged(trigger).await;
                if drained == 0
                    || self.shutdown.is_cancelled()
                    || !self.queue.burst_ready(self.burst_threshold)
                {
                    break;
                }
            }
        }
    }

    async fn run_logged(&self, trigger: &str) -> usize {
        match self.run_batch().await {
            Ok(report) => {
                if report.drained > 0 {
                    info!(
                        trigger,
                        drained = report.drained,
                        partitions = report.partitions,
                        failed = report.failed_partitions,
                        tokens = report.tokens_used,
                        "batch run complete"
                    );
                }
                report.drained
            }
            Err(Error::BudgetExhausted) => 0,
            Err(e) => {
                error!(trigger, "batch run error: {e}");
                0
            }
        }
    }

    /// Drain, partition by kind, dispatch each partition once, write results.
    ///
    /// A call while another run is active is a no-op returning an empty report.
    ///
    /// # Errors
    /// [`Error::BudgetExhausted`] when the daily allowance is spent; nothing
    /// is drained in that case.
    pub async fn run_batch(&self) -> Result<BatchReport> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            debug!("batch already in progress, skipping trigger");
            return Ok(BatchReport::default());
        };

        if self.budget.reset_if_new_day() {
            self.events.record(EventKind::BudgetReset);
        }

        if !self.budget.can_dispatch() {
            let state = self.budget.snapshot();
            let pending = self.queue.size();
            warn!(
                pending,
                tokens_used_today = state.tokens_used_today,
                cost_used_today = state.cost_used_today,
                "daily budget exhausted, deferring batch"
            );
            self.events.record(EventKind::BatchDeferred {
                pending,
                tokens_used_today: state.tokens_used_today,
            });
            metrics::batches_deferred().add(1, &[]);
            return Err(Error::BudgetExhausted);
        }

        let results = &self.results;
        let tasks = self
            .queue
            .drain_with(self.max_batch_size, |drained| results.mark_in_flight(drained));
        if tasks.is_empty() {
            return Ok(BatchReport::default());
        }

        let mut report = BatchReport {
            drained: tasks.len(),
            ..Default::default()
        };

        let mut in_flight: JoinSet<(TaskKind, Vec<Task>, Result<UpstreamResponse>)> =
            JoinSet::new();
        let mut unsettled = Unsettled {
            scheduler: self,
            owners: HashMap::new(),
        };

        for (kind, partition) in partition_by_kind(tasks) {
            report.partitions += 1;
            let ids = partition.iter().map(|t| t.id).collect();
            let upstream = Arc::clone(&self.upstream);
            let timeout = self.dispatch_timeout;
            let span = start_batch_span(kind, partition.len());

            let handle = in_flight.spawn(
                async move {
                    let request = UpstreamRequest::for_batch(kind, &partition);
                    let outcome = dispatch_bounded(upstream.as_ref(), request, timeout).await;
                    match &outcome {
                        Ok(response) => {
                            record_batch_outcome(&tracing::Span::current(), "ok", response.tokens_used)
                        }
                        Err(_) => record_batch_outcome(&tracing::Span::current(), "failed", 0),
                    }
                    (kind, partition, outcome)
                }
                .instrument(span),
            );
            unsettled.owners.insert(handle.id(), (kind, ids));
        }

        while let Some(joined) = in_flight.join_next_with_id().await {
            match joined {
                Ok((id, (kind, partition, outcome))) => {
                    unsettled.take(id);
                    self.settle(kind, &partition, outcome, &mut report);
                }
                Err(join_err) => {
                    // The dispatch future panicked; its tasks still get error results.
                    let Some((kind, ids)) = unsettled.take(join_err.id()) else {
                        continue;
                    };
                    error!(%kind, "dispatch task aborted: {join_err}");
                    self.fail_partition(kind, &ids, &format!("dispatch aborted: {join_err}"));
                    report.failed_partitions += 1;
                }
            }
        }

        Ok(report)
    }

    fn settle(
        &self,
        kind: TaskKind,
        partition: &[Task],
        outcome: Result<UpstreamResponse>,
        report: &mut BatchReport,
    ) {
        match outcome {
            Ok(response) => {
                let tokens = apportion_tokens(response.tokens_used, partition.len());
                let costs = apportion_cost(response.cost, partition.len());
                let now = Utc::now();
                for (((task, value), tokens_used), cost) in partition
                    .iter()
                    .zip(response.results)
                    .zip(tokens)
                    .zip(costs)
                {
                    self.store(TaskResult {
                        task_id: task.id,
                        value: ResultValue::Success(value),
                        tokens_used,
                        cost,
                        completed_at: now,
                    });
                }
                self.events.record(EventKind::BatchDispatched {
                    kind,
                    task_count: partition.len(),
                    tokens_used: response.tokens_used,
                    cost: response.cost,
                });
                metrics::batches_dispatched().add(1, &[KeyValue::new("kind", kind.as_str())]);
                self.budget.record_usage(response.tokens_used, response.cost);
                report.tokens_used += response.tokens_used;
                report.cost += response.cost;
            }
            Err(e) => {
                warn!(%kind, tasks = partition.len(), "partition failed: {e}");
                let ids: Vec<TaskId> = partition.iter().map(|t| t.id).collect();
                self.fail_partition(kind, &ids, &e.to_string());
                report.failed_partitions += 1;
            }
        }
    }

    fn fail_partition(&self, kind: TaskKind, ids: &[TaskId], message: &str) {
        let now = Utc::now();
        for &task_id in ids {
            self.store(TaskResult {
                task_id,
                value: ResultValue::Error {
                    message: message.to_string(),
                    retryable: true,
                },
                tokens_used: 0,
                cost: 0.0,
                completed_at: now,
            });
        }
        self.events.record(EventKind::BatchFailed {
            kind,
            task_count: ids.len(),
            error: message.to_string(),
        });
        metrics::batches_failed().add(1, &[KeyValue::new("kind", kind.as_str())]);
    }

    fn store(&self, result: TaskResult) {
        self.events.record(EventKind::ResultStored {
            task_id: result.task_id,
            success: result.is_success(),
        });
        self.results.put(result);
    }
}

/// Call upstream with a deadline; a short result list counts as a failure.
async fn dispatch_bounded(
    upstream: &dyn Upstream,
    request: UpstreamRequest,
    timeout: Duration,
) -> Result<UpstreamResponse> {
    let expected = request.task_count;
    match tokio::time::timeout(timeout, upstream.dispatch(request)).await {
        Ok(Ok(response)) if response.results.len() == expected => Ok(response),
        Ok(Ok(response)) => Err(Error::UpstreamDispatchFailed(format!(
            "expected {expected} results, got {}",
            response.results.len()
        ))),
        Ok(Err(e @ Error::UpstreamDispatchFailed(_))) => Err(e),
        Ok(Err(e)) => Err(Error::UpstreamDispatchFailed(e.to_string())),
        Err(_) => Err(Error::UpstreamDispatchFailed(format!(
            "no response within {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Group tasks by kind, keeping enqueue order within each group.
pub fn partition_by_kind(tasks: Vec<Task>) -> BTreeMap<TaskKind, Vec<Task>> {
    let mut groups: BTreeMap<TaskKind, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        groups.entry(task.kind).or_default().push(task);
    }
    groups
}

/// Split `total` tokens over `n` tasks. The shares sum to exactly `total`;
/// the remainder goes one token each to the first tasks.
pub fn apportion_tokens(total: u64, n: usize) -> Vec<u64> {
    if n == 0 {
        return Vec::new();
    }
    let n64 = n as u64;
    let base = total / n64;
    let remainder = (total % n64) as usize;
    (0..n)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}

/// Split `total` cost evenly over `n` tasks; the last share absorbs rounding.
pub fn apportion_cost(total: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let share = total / n as f64;
    let mut shares = vec![share; n];
    shares[n - 1] = total - share * (n - 1) as f64;
    shares
}
