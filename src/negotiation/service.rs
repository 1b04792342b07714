//! Negotiation flow: assess, run eligible negotiations through the batch
//! queue, validate the proposal, and hand everything else to a human.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::BatchService;
use crate::event::EventKind;
use crate::model::negotiation::{
    NegotiationContext, NegotiationProposal, NegotiationStrategy, Timeline,
};
use crate::model::{Priority, ResultValue, TaskKind};
use crate::telemetry::metrics;

use super::escalation::{HandoffPackage, InterventionPoint, Notifier};
use super::{assess, build_negotiation_prompt, validate_proposal};

pub const ESCALATION_MESSAGE: &str = "Thanks for your patience. A member of our sales team \
will take this negotiation from here and follow up with you shortly.";

/// What the caller gets back from a negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationOutcome {
    pub success: bool,
    pub escalated: bool,
    /// Customer-facing text.
    pub response: String,
    pub strategy: NegotiationStrategy,
    pub proposal: Option<NegotiationProposal>,
    pub handoff: Option<HandoffPackage>,
    pub audit_trail: Vec<InterventionPoint>,
    pub cost: f64,
}

pub struct NegotiationService {
    batch: Arc<BatchService>,
    notifier: Arc<dyn Notifier>,
    result_timeout: Duration,
}

impl NegotiationService {
    pub fn new(batch: Arc<BatchService>, notifier: Arc<dyn Notifier>) -> Self {
        let result_timeout = batch.config().poll_timeout();
        Self {
            batch,
            notifier,
            result_timeout,
        }
    }

    pub fn with_result_timeout(mut self, timeout: Duration) -> Self {
        self.result_timeout = timeout;
        self
    }

    /// Negotiate, or escalate. Never fails: every problem becomes an escalation.
    pub async fn negotiate(&self, request: &str, ctx: &NegotiationContext) -> NegotiationOutcome {
        let strategy = assess(ctx);
        if !strategy.ai_eligible {
            let reason = format!("not eligible for AI: {}", strategy.reasons.join("; "));
            return self.escalate(request, ctx, strategy, reason, 0.0).await;
        }

        let prompt = build_negotiation_prompt(request, ctx, &strategy);
        let priority = match ctx.timeline {
            Timeline::Immediate => Priority::High,
            Timeline::Days | Timeline::Weeks => Priority::Medium,
        };
        let task_id = match self
            .batch
            .enqueue_task(TaskKind::Negotiation, prompt, priority)
        {
            Ok(id) => id,
            Err(e) => {
                let reason = format!("could not queue negotiation: {e}");
                return self.escalate(request, ctx, strategy, reason, 0.0).await;
            }
        };

        let result = match self
            .batch
            .wait_for_result(task_id, self.result_timeout, &CancellationToken::new())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                // Nobody will read a late answer; don't pay for it.
                self.batch.withdraw(task_id);
                let reason = format!("AI negotiation unavailable: {e}");
                return self.escalate(request, ctx, strategy, reason, 0.0).await;
            }
        };

        let cost = result.cost;
        let proposal = match result.value {
            ResultValue::Success(value) => match parse_proposal(value) {
                Some(p) => p,
                None => {
                    let reason = "AI proposal was not in the expected format".to_string();
                    return self.escalate(request, ctx, strategy, reason, cost).await;
                }
            },
            ResultValue::Error { message, .. } => {
                let reason = format!("AI negotiation failed: {message}");
                return self.escalate(request, ctx, strategy, reason, cost).await;
            }
        };

        if let Err(e) = validate_proposal(&proposal, ctx) {
            warn!(%task_id, "negotiation proposal rejected: {e}");
            let reason = e.to_string();
            let mut outcome = self.escalate(request, ctx, strategy, reason, cost).await;
            outcome.proposal = Some(proposal);
            return outcome;
        }

        info!(%task_id, approach = %strategy.approach, "negotiation handled by AI");
        NegotiationOutcome {
            success: true,
            escalated: false,
            response: proposal.message.clone(),
            strategy,
            proposal: Some(proposal),
            handoff: None,
            audit_trail: Vec::new(),
            cost,
        }
    }

    async fn escalate(
        &self,
        request: &str,
        ctx: &NegotiationContext,
        strategy: NegotiationStrategy,
        reason: String,
        cost: f64,
    ) -> NegotiationOutcome {
        let package = HandoffPackage::build(request, ctx, &strategy, reason.clone());
        info!(
            handoff_id = %package.id,
            urgency = %package.urgency,
            %reason,
            "escalating negotiation"
        );

        if let Err(e) = self.notifier.notify(&package).await {
            warn!(handoff_id = %package.id, "handoff notification failed: {e}");
        }
        self.batch.record_event(EventKind::NegotiationEscalated {
            reason: reason.clone(),
            urgency: package.urgency,
            deal_value: ctx.deal_value,
        });
        metrics::escalations().add(1, &[KeyValue::new("urgency", package.urgency.to_string())]);

        NegotiationOutcome {
            success: false,
            escalated: true,
            response: ESCALATION_MESSAGE.to_string(),
            strategy,
            proposal: None,
            handoff: Some(package),
            audit_trail: vec![InterventionPoint::new(reason, ctx)],
            cost,
        }
    }
}

/// The model may return the proposal as an object or as a JSON string.
fn parse_proposal(value: serde_json::Value) -> Option<NegotiationProposal> {
    match value {
        serde_json::Value::String(text) => {
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            serde_json::from_str(text.get(start..=end)?).ok()
        }
        other => serde_json::from_value(other).ok(),
    }
}
