//! Human handoff for negotiations the AI must not close alone.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::model::negotiation::{
    Approach, Complexity, CustomerTier, NegotiationContext, NegotiationStrategy, RiskLevel,
    Timeline,
};

use super::{AI_DEAL_CEILING, LARGE_DEAL, URGENT_DEAL};

/// Deals above this value are at least medium urgency.
pub const MEDIUM_URGENCY_DEAL: f64 = 75_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        };
        write!(f, "{s}")
    }
}

pub fn urgency(ctx: &NegotiationContext) -> Urgency {
    if (ctx.timeline == Timeline::Immediate && ctx.deal_value > URGENT_DEAL)
        || ctx.customer_tier == CustomerTier::Platinum
    {
        Urgency::High
    } else if ctx.deal_value > MEDIUM_URGENCY_DEAL {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

pub fn risk_factors(ctx: &NegotiationContext) -> Vec<String> {
    let mut factors = Vec::new();
    if ctx.deal_value > AI_DEAL_CEILING {
        factors.push("deal value above AI authority".to_string());
    } else if ctx.deal_value > LARGE_DEAL {
        factors.push("high deal value".to_string());
    }
    if ctx.complexity == Complexity::Complex {
        factors.push("complex terms".to_string());
    }
    if ctx.stakeholders > 3 {
        factors.push(format!("{} stakeholders", ctx.stakeholders));
    }
    if ctx.risk_level == RiskLevel::High {
        factors.push("high risk profile".to_string());
    }
    if matches!(ctx.customer_tier, CustomerTier::Gold | CustomerTier::Platinum) {
        factors.push(format!("{} tier relationship", ctx.customer_tier));
    }
    if ctx.timeline == Timeline::Immediate {
        factors.push("immediate deadline".to_string());
    }
    if ctx.negotiation_history.len() > 3 {
        factors.push(format!(
            "prolonged negotiation ({} prior rounds)",
            ctx.negotiation_history.len()
        ));
    }
    factors
}

fn playbook(approach: Approach) -> &'static str {
    match approach {
        Approach::PremiumServiceFocus => {
            "Lead with dedicated account management and service guarantees before discussing price."
        }
        Approach::ExpeditedSolution => {
            "Confirm capacity for the requested dates first; trade speed for firm commitment."
        }
        Approach::ValueOptimization => {
            "Bundle lanes or volume to raise value instead of lowering the rate."
        }
        Approach::RiskMitigation => {
            "Address the customer's risk concerns with insurance, tracking and contractual safeguards."
        }
        Approach::CollaborativeProblemSolving => {
            "Map the customer's constraints and build the offer jointly around them."
        }
    }
}

/// Everything a human needs to pick the negotiation up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffPackage {
    pub id: Uuid,
    pub original_request: String,
    pub context: NegotiationContext,
    pub reason: String,
    pub ai_pre_analysis: String,
    pub suggested_approach: String,
    pub risk_factors: Vec<String>,
    pub urgency: Urgency,
    pub created_at: DateTime<Utc>,
}

impl HandoffPackage {
    pub fn build(
        request: &str,
        ctx: &NegotiationContext,
        strategy: &NegotiationStrategy,
        reason: impl Into<String>,
    ) -> Self {
        let ai_pre_analysis = format!(
            "{} customer, deal value {:.0}, {} complexity with {} stakeholder(s), {} risk, {} timeline. \
             AI confidence {}/100; max autonomous concession {}%.",
            ctx.customer_tier,
            ctx.deal_value,
            ctx.complexity,
            ctx.stakeholders,
            ctx.risk_level,
            ctx.timeline,
            strategy.confidence_score,
            strategy.max_concession_pct,
        );
        Self {
            id: Uuid::new_v4(),
            original_request: request.to_string(),
            context: ctx.clone(),
            reason: reason.into(),
            ai_pre_analysis,
            suggested_approach: format!("{}: {}", strategy.approach, playbook(strategy.approach)),
            risk_factors: risk_factors(ctx),
            urgency: urgency(ctx),
            created_at: Utc::now(),
        }
    }
}

/// One point where the AI stepped back, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionPoint {
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub deal_value: f64,
    pub customer_tier: CustomerTier,
    pub risk_level: RiskLevel,
}

impl InterventionPoint {
    pub fn new(reason: impl Into<String>, ctx: &NegotiationContext) -> Self {
        Self {
            timestamp: Utc::now(),
            reason: reason.into(),
            deal_value: ctx.deal_value,
            customer_tier: ctx.customer_tier,
            risk_level: ctx.risk_level,
        }
    }
}

/// Sink for handoff packages. Fire-and-forget: failures are logged by the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, package: &HandoffPackage) -> Result<()>;
}

/// Notifier that only writes the handoff to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, package: &HandoffPackage) -> Result<()> {
        info!(
            handoff_id = %package.id,
            urgency = %package.urgency,
            deal_value = package.context.deal_value,
            reason = %package.reason,
            "negotiation handed to sales team"
        );
        Ok(())
    }
}
