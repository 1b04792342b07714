//! Core data model.
//!
//! A task is one unit of deferred AI work. It has a kind (which decides how it
//! is batched), an opaque payload, and a priority. Tasks are immutable once
//! admitted; the scheduler consumes each exactly once and writes a result.

pub mod negotiation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of deferred work waiting in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Opaque text sent upstream. The engine doesn't interpret it.
    pub payload: String,
    pub priority: Priority,
    /// Diagnostics only; ordering comes from the queue itself.
    pub enqueued_at: DateTime<Utc>,
}

impl Task {
    pub fn new(kind: TaskKind, payload: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            payload: payload.into(),
            priority,
            enqueued_at: Utc::now(),
        }
    }
}

/// Newtype for task IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Kind / Priority
// ---------------------------------------------------------------------------

/// What kind of work a task is. Tasks of the same kind share a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    EmailAnalysis,
    LeadQualification,
    ContractReview,
    Scheduling,
    SalesCall,
    Negotiation,
    CustomerSupport,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::EmailAnalysis,
        TaskKind::LeadQualification,
        TaskKind::ContractReview,
        TaskKind::Scheduling,
        TaskKind::SalesCall,
        TaskKind::Negotiation,
        TaskKind::CustomerSupport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::EmailAnalysis => "email_analysis",
            TaskKind::LeadQualification => "lead_qualification",
            TaskKind::ContractReview => "contract_review",
            TaskKind::Scheduling => "scheduling",
            TaskKind::SalesCall => "sales_call",
            TaskKind::Negotiation => "negotiation",
            TaskKind::CustomerSupport => "customer_support",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| crate::error::Error::Other(format!("unknown task kind: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(crate::error::Error::Other(format!(
                "unknown priority: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of a completed task. Written once by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub value: ResultValue,
    /// Share of the batch's tokens apportioned to this task.
    pub tokens_used: u64,
    /// Share of the batch's cost apportioned to this task.
    pub cost: f64,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self.value, ResultValue::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultValue {
    /// Opaque upstream response for this task.
    Success(serde_json::Value),
    /// The batch carrying this task failed.
    Error { message: String, retryable: bool },
}

/// Where a task is while it has no result yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingState {
    /// Still waiting in the queue; position 0 is the head.
    Queued { position: usize },
    /// Drained into a batch whose upstream call has not returned.
    InFlight,
}

/// Three-way lookup outcome for a task id.
#[derive(Debug, Clone)]
pub enum ResultLookup {
    Ready(TaskResult),
    Pending(PendingState),
    NotFound,
}

impl ResultLookup {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResultLookup::Ready(_))
    }
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// Snapshot for diagnostics and dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    pub queue_size: usize,
    pub tokens_used_today: u64,
    pub daily_token_limit: u64,
    pub daily_cost_used: f64,
    pub daily_cost_limit: f64,
}
