//! Negotiation policy: decide whether the AI may handle a negotiation on its
//! own, and check what it proposes against hard business rules.
//!
//! Scoring starts at 100 confidence and deducts points per risk signal.
//! Some signals force escalation outright regardless of the score.

pub mod escalation;
pub mod service;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::negotiation::{
    Approach, Complexity, CustomerTier, NegotiationContext, NegotiationProposal,
    NegotiationStrategy, RiskLevel, Timeline,
};

pub use escalation::{HandoffPackage, InterventionPoint, LogNotifier, Notifier, Urgency};
pub use service::{NegotiationOutcome, NegotiationService};

/// Above this deal value confidence drops by 30.
pub const LARGE_DEAL: f64 = 50_000.0;
/// Above this deal value the AI never negotiates alone.
pub const AI_DEAL_CEILING: f64 = 100_000.0;
/// Immediate-timeline deals above this value need a human.
pub const URGENT_DEAL: f64 = 25_000.0;
/// Below this deal value the default approach is value optimization.
pub const SMALL_DEAL: f64 = 10_000.0;
pub const MIN_CONFIDENCE: u32 = 60;
pub const MAX_CONCESSION_PCT: u32 = 15;

/// Proposal limits.
pub const MAX_PROPOSAL_DISCOUNT_PCT: f64 = 20.0;
pub const MIN_PROPOSAL_CONFIDENCE: f64 = 70.0;
/// Net-60/90 in any common spelling: "net 60", "Net-90", "NET90", "60-day terms".
static EXTENDED_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnet[\s-]*(60|90)\b|\b(60|90)[\s-]*days?\b").expect("extended terms regex")
});

/// Classify a negotiation as AI-handleable or must-escalate.
pub fn assess(ctx: &NegotiationContext) -> NegotiationStrategy {
    let mut confidence: i64 = 100;
    let mut forced_escalation = false;
    let mut reasons = Vec::new();

    if ctx.deal_value > LARGE_DEAL {
        confidence -= 30;
        reasons.push(format!("deal value {:.0} above {LARGE_DEAL:.0}", ctx.deal_value));
    }
    if ctx.deal_value > AI_DEAL_CEILING {
        forced_escalation = true;
        reasons.push(format!(
            "deal value {:.0} above AI ceiling of {AI_DEAL_CEILING:.0}",
            ctx.deal_value
        ));
    }
    if ctx.complexity == Complexity::Complex {
        confidence -= 40;
        reasons.push("complex negotiation".to_string());
        if ctx.stakeholders > 3 {
            forced_escalation = true;
            reasons.push(format!(
                "complex negotiation with {} stakeholders",
                ctx.stakeholders
            ));
        }
    }
    if ctx.risk_level == RiskLevel::High {
        confidence -= 25;
        reasons.push("high risk".to_string());
    }
    if matches!(ctx.customer_tier, CustomerTier::Gold | CustomerTier::Platinum) {
        confidence -= 20;
        reasons.push(format!("{} tier customer", ctx.customer_tier));
    }
    if ctx.timeline == Timeline::Immediate && ctx.deal_value > URGENT_DEAL {
        forced_escalation = true;
        reasons.push(format!(
            "immediate timeline on a deal above {URGENT_DEAL:.0}"
        ));
    }

    let confidence_score = confidence.max(0) as u32;
    let ai_eligible = !forced_escalation && confidence_score >= MIN_CONFIDENCE;
    if !forced_escalation && !ai_eligible {
        reasons.push(format!(
            "confidence {confidence_score} below {MIN_CONFIDENCE}"
        ));
    }

    NegotiationStrategy {
        ai_eligible,
        approach: choose_approach(ctx),
        max_concession_pct: max_concession(ctx),
        confidence_score,
        reasons,
    }
}

fn choose_approach(ctx: &NegotiationContext) -> Approach {
    if ctx.customer_tier == CustomerTier::Platinum {
        Approach::PremiumServiceFocus
    } else if ctx.timeline == Timeline::Immediate {
        Approach::ExpeditedSolution
    } else if ctx.deal_value < SMALL_DEAL {
        Approach::ValueOptimization
    } else if ctx.risk_level == RiskLevel::High {
        Approach::RiskMitigation
    } else {
        Approach::CollaborativeProblemSolving
    }
}

fn max_concession(ctx: &NegotiationContext) -> u32 {
    let mut pct = if ctx.deal_value > LARGE_DEAL { 3 } else { 5 };
    pct += match ctx.customer_tier {
        CustomerTier::Platinum => 2,
        CustomerTier::Gold => 1,
        CustomerTier::Silver | CustomerTier::Bronze => 0,
    };
    if ctx.risk_level == RiskLevel::Low {
        pct += 2;
    }
    pct.min(MAX_CONCESSION_PCT)
}

/// Check a model proposal against the hard rules.
///
/// # Errors
/// [`Error::ValidationFailed`] listing every rule the proposal breaks.
pub fn validate_proposal(proposal: &NegotiationProposal, ctx: &NegotiationContext) -> Result<()> {
    let mut violations = Vec::new();

    let discount = proposal.implied_discount_pct(ctx.deal_value);
    if discount > MAX_PROPOSAL_DISCOUNT_PCT {
        violations.push(format!(
            "implied discount {discount:.1}% exceeds {MAX_PROPOSAL_DISCOUNT_PCT:.0}%"
        ));
    } else if discount < 0.0 {
        violations.push(format!(
            "proposed value {:.2} is above the deal value {:.2}",
            proposal.proposed_value, ctx.deal_value
        ));
    }

    if let Some(terms) = &proposal.payment_terms {
        if !ctx.extended_terms_approved && EXTENDED_TERMS.is_match(terms) {
            violations.push(format!("extended payment terms '{terms}' need approval"));
        }
    }

    if proposal.confidence < MIN_PROPOSAL_CONFIDENCE {
        violations.push(format!(
            "model confidence {:.0} below {MIN_PROPOSAL_CONFIDENCE:.0}",
            proposal.confidence
        ));
    }

    if proposal.requests_escalation {
        violations.push("model requested escalation".to_string());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationFailed(violations))
    }
}

/// Prompt for a negotiation task, embedding the limits the model must respect.
pub fn build_negotiation_prompt(
    request: &str,
    ctx: &NegotiationContext,
    strategy: &NegotiationStrategy,
) -> String {
    let mut prompt = format!(
        "Negotiate on behalf of the carrier.\n\
         Customer request: {request}\n\
         Deal value: {:.2}\n\
         Customer tier: {}\n\
         Timeline: {}\n\
         Risk level: {}\n\
         Approach: {}\n\
         Maximum concession: {}% of deal value\n\
         Standard payment terms only (net 30) unless stated otherwise.\n",
        ctx.deal_value,
        ctx.customer_tier,
        ctx.timeline,
        ctx.risk_level,
        strategy.approach,
        strategy.max_concession_pct,
    );
    if ctx.extended_terms_approved {
        prompt.push_str("Extended payment terms have been approved for this customer.\n");
    }
    if !ctx.negotiation_history.is_empty() {
        prompt.push_str("History:\n");
        for entry in &ctx.negotiation_history {
            prompt.push_str(&format!("- {entry}\n"));
        }
    }
    prompt.push_str(
        "Reply with a JSON object: {\"message\": string, \"proposed_value\": number, \
         \"payment_terms\": string, \"confidence\": number 0-100, \
         \"requests_escalation\": boolean}",
    );
    prompt
}
