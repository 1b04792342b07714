//! Batch dispatch span helpers.

use tracing::Span;

use crate::model::TaskKind;

/// Start a span covering one partition's upstream round trip.
///
/// `batch.outcome` and `batch.tokens` are filled via [`record_batch_outcome`].
pub fn start_batch_span(kind: TaskKind, task_count: usize) -> Span {
    tracing::info_span!(
        "batch.dispatch",
        "batch.kind" = kind.as_str(),
        "batch.task_count" = task_count,
        "batch.outcome" = tracing::field::Empty,
        "batch.tokens" = tracing::field::Empty,
    )
}

/// Record how a partition ended ("ok" or "failed").
pub fn record_batch_outcome(span: &Span, outcome: &str, tokens: u64) {
    span.record("batch.outcome", outcome);
    span.record("batch.tokens", tokens);
    span.in_scope(|| {
        tracing::info!(outcome, tokens, "batch_finished");
    });
}
