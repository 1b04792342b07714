//! Error types for freight-ai.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Daily token or cost allowance used up. Soft: the cycle is skipped.
    #[error("daily AI budget exhausted")]
    BudgetExhausted,

    #[error("upstream dispatch failed: {0}")]
    UpstreamDispatchFailed(String),

    /// Business-rule rejection of an AI-proposed negotiation outcome.
    #[error("proposal failed validation: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("timed out after {waited_ms}ms waiting for task {task_id}")]
    PollTimedOut { task_id: String, waited_ms: u64 },

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("task queue full ({capacity} pending)")]
    QueueFull { capacity: usize },

    #[error("wait cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
