//! Structured events emitted by the batch engine and negotiation path.
//!
//! Consumers read the log to build dashboards, alerting, or audit trails.
//! Events are the engine's voice; tracing output is the operator's.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::model::{Priority, TaskId, TaskKind};
use crate::negotiation::escalation::Urgency;

/// Oldest events are dropped beyond this many.
const MAX_EVENTS: usize = 10_000;

/// A structured event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number, starting at 1. Consumers can detect gaps.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    TaskEnqueued {
        id: TaskId,
        kind: TaskKind,
        priority: Priority,
        queue_size: usize,
    },
    TaskWithdrawn {
        task_id: TaskId,
    },
    BurstTriggered {
        queue_size: usize,
    },
    BatchDeferred {
        pending: usize,
        tokens_used_today: u64,
    },
    BatchDispatched {
        kind: TaskKind,
        task_count: usize,
        tokens_used: u64,
        cost: f64,
    },
    BatchFailed {
        kind: TaskKind,
        task_count: usize,
        error: String,
    },
    ResultStored {
        task_id: TaskId,
        success: bool,
    },
    NegotiationEscalated {
        reason: String,
        urgency: Urgency,
        deal_value: f64,
    },
    BudgetReset,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    events: VecDeque<Event>,
}

/// Bounded in-memory event log.
#[derive(Default)]
pub struct EventLog {
    inner: Mutex<Inner>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: EventKind) -> u64 {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.events.push_back(Event {
            seq,
            timestamp: Utc::now(),
            kind,
        });
        if inner.events.len() > MAX_EVENTS {
            inner.events.pop_front();
        }
        seq
    }

    /// Events with `seq > since_seq`, oldest first.
    pub fn since(&self, since_seq: u64) -> Vec<Event> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .events
            .iter()
            .filter(|e| e.seq > since_seq)
            .cloned()
            .collect()
    }
}
