//! Platform orchestrator: the single entry point for AI requests.
//!
//! Routes by kind (sales calls to the script generator, negotiations
//! through the policy, everything else through the batch queue), then runs
//! the result through quality supervision. Callers always get an envelope
//! back; internal errors turn into a polite handoff message.

pub mod legacy;
pub mod script;
pub mod supervision;

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info_span};

use crate::engine::BatchService;
use crate::error::{Error, Result};
use crate::model::negotiation::NegotiationContext;
use crate::model::{Priority, ResultValue, TaskKind};
use crate::negotiation::{NegotiationService, Notifier};
use crate::telemetry::metrics;

pub use legacy::{LegacyAdapter, LegacyService};

pub const FALLBACK_MESSAGE: &str = "We're sorry, we couldn't complete that request right now. \
A member of our team has been notified and will get back to you personally.";

/// Confidence assigned to batch-path responses the model returned cleanly.
const BATCH_CONFIDENCE: u32 = 80;
const SCRIPT_CONFIDENCE: u32 = 85;
/// Deducted per unresolved supervision issue.
const UNRESOLVED_PENALTY: u32 = 15;

/// Extra information a request may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub customer_name: Option<String>,
    pub company_name: Option<String>,
    /// Required for negotiation requests.
    pub negotiation: Option<NegotiationContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Supervised,
    Unsupervised,
}

/// Uniform response for every request kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub response: String,
    pub quality: Quality,
    pub cost: f64,
    pub escalated: bool,
    pub corrections: Vec<String>,
    /// 0..=100.
    pub confidence: u32,
    pub processing_time_ms: u64,
}

impl ResponseEnvelope {
    fn fallback() -> Self {
        Self {
            response: FALLBACK_MESSAGE.to_string(),
            quality: Quality::Unsupervised,
            cost: 0.0,
            escalated: true,
            corrections: Vec::new(),
            confidence: 0,
            processing_time_ms: 0,
        }
    }
}

/// A path's answer before supervision.
struct RawResponse {
    text: String,
    cost: f64,
    escalated: bool,
    confidence: u32,
}

pub struct PlatformOrchestrator {
    batch: Arc<BatchService>,
    negotiation: NegotiationService,
}

impl PlatformOrchestrator {
    pub fn new(batch: Arc<BatchService>, notifier: Arc<dyn Notifier>) -> Self {
        let negotiation = NegotiationService::new(Arc::clone(&batch), notifier);
        Self { batch, negotiation }
    }

    pub fn with_negotiation(batch: Arc<BatchService>, negotiation: NegotiationService) -> Self {
        Self { batch, negotiation }
    }

    pub fn batch(&self) -> &BatchService {
        &self.batch
    }

    pub async fn process_request(
        &self,
        kind: TaskKind,
        content: &str,
        context: &RequestContext,
        priority: Priority,
    ) -> ResponseEnvelope {
        let started = Instant::now();
        let span = info_span!("platform.request", kind = kind.as_str(), %priority);

        let mut envelope = match self
            .route(kind, content, context, priority)
            .instrument(span)
            .await
        {
            Ok(raw) => Self::supervise(raw, context),
            Err(e) => {
                error!(%kind, "request failed, returning fallback: {e}");
                ResponseEnvelope::fallback()
            }
        };

        envelope.processing_time_ms = started.elapsed().as_millis() as u64;
        metrics::request_duration_ms().record(
            envelope.processing_time_ms as f64,
            &[KeyValue::new("kind", kind.as_str())],
        );
        envelope
    }

    async fn route(
        &self,
        kind: TaskKind,
        content: &str,
        context: &RequestContext,
        priority: Priority,
    ) -> Result<RawResponse> {
        match kind {
            TaskKind::SalesCall => Ok(RawResponse {
                text: script::sales_call_script(content, context),
                cost: 0.0,
                escalated: false,
                confidence: SCRIPT_CONFIDENCE,
            }),
            TaskKind::Negotiation => {
                let ctx = context.negotiation.as_ref().ok_or_else(|| {
                    Error::Other("negotiation request without negotiation context".to_string())
                })?;
                let outcome = self.negotiation.negotiate(content, ctx).await;
                let confidence = outcome
                    .proposal
                    .as_ref()
                    .filter(|_| outcome.success)
                    .map(|p| p.confidence.clamp(0.0, 100.0) as u32)
                    .unwrap_or(outcome.strategy.confidence_score);
                Ok(RawResponse {
                    text: outcome.response,
                    cost: outcome.cost,
                    escalated: outcome.escalated,
                    confidence,
                })
            }
            _ => {
                let id = self.batch.enqueue_task(kind, content, priority)?;
                let result = self.batch.await_result(id).await.inspect_err(|_| {
                    self.batch.withdraw(id);
                })?;
                match result.value {
                    ResultValue::Success(value) => Ok(RawResponse {
                        text: value_text(value),
                        cost: result.cost,
                        escalated: false,
                        confidence: BATCH_CONFIDENCE,
                    }),
                    ResultValue::Error { message, .. } => {
                        Err(Error::UpstreamDispatchFailed(message))
                    }
                }
            }
        }
    }

    fn supervise(raw: RawResponse, context: &RequestContext) -> ResponseEnvelope {
        let report = supervision::supervise(&raw.text, context.customer_name.as_deref());
        let penalty = UNRESOLVED_PENALTY * report.unresolved.len() as u32;
        ResponseEnvelope {
            escalated: raw.escalated || !report.is_clean(),
            confidence: raw.confidence.saturating_sub(penalty),
            response: report.text,
            quality: Quality::Supervised,
            cost: raw.cost,
            corrections: report.corrections,
            processing_time_ms: 0,
        }
    }
}

/// Text for a batch result: strings as-is, anything else as compact JSON.
fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
