//! Metric instrument factories for freight-ai.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments come from the `"freight-ai"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("freight-ai")
}

/// Counter: tasks admitted to the queue.
/// Labels: `kind`, `priority`.
pub fn tasks_enqueued() -> Counter<u64> {
    meter()
        .u64_counter("freight_ai.tasks.enqueued")
        .with_description("Number of tasks admitted to the batch queue")
        .build()
}

/// Counter: partitions dispatched upstream.
/// Labels: `kind`.
pub fn batches_dispatched() -> Counter<u64> {
    meter()
        .u64_counter("freight_ai.batches.dispatched")
        .with_description("Number of same-kind batches sent upstream")
        .build()
}

/// Counter: scheduler cycles skipped because the daily budget was spent.
pub fn batches_deferred() -> Counter<u64> {
    meter()
        .u64_counter("freight_ai.batches.deferred")
        .with_description("Number of batch cycles deferred by the budget guard")
        .build()
}

/// Counter: partitions that failed or timed out.
/// Labels: `kind`.
pub fn batches_failed() -> Counter<u64> {
    meter()
        .u64_counter("freight_ai.batches.failed")
        .with_description("Number of batches whose upstream call failed")
        .build()
}

/// Counter: LLM token usage.
/// Labels: `model`.
pub fn llm_tokens() -> Counter<u64> {
    meter()
        .u64_counter("freight_ai.llm.tokens")
        .with_description("LLM token usage")
        .build()
}

/// Counter: requests handed to a human.
/// Labels: `urgency`.
pub fn escalations() -> Counter<u64> {
    meter()
        .u64_counter("freight_ai.escalations")
        .with_description("Number of negotiation escalations")
        .build()
}

/// Histogram: end-to-end request duration in milliseconds.
/// Labels: `kind`.
pub fn request_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("freight_ai.request.duration_ms")
        .with_description("Platform request duration in milliseconds")
        .with_unit("ms")
        .build()
}
