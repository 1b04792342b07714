//! Tests for the negotiation policy, proposal validation and escalation flow.

mod common;

use std::sync::Arc;

use common::{FailingUpstream, FixedUpstream, RecordingNotifier, service, test_config};
use freight_ai::engine::BatchService;
use freight_ai::error::Error;
use freight_ai::event::EventKind;
use freight_ai::llm::Upstream;
use freight_ai::model::negotiation::{
    Approach, Complexity, CustomerTier, NegotiationContext, NegotiationProposal, RiskLevel,
    Timeline,
};
use freight_ai::negotiation::escalation::{risk_factors, urgency};
use freight_ai::negotiation::service::ESCALATION_MESSAGE;
use freight_ai::negotiation::{
    HandoffPackage, MAX_CONCESSION_PCT, NegotiationService, Urgency, assess, validate_proposal,
};
use serde_json::json;

fn ctx(deal: f64, tier: CustomerTier, risk: RiskLevel) -> NegotiationContext {
    NegotiationContext::new(deal, Complexity::Simple, Timeline::Days, risk, tier)
}

fn proposal(value: f64, confidence: f64) -> NegotiationProposal {
    NegotiationProposal {
        message: "We can do this lane at the proposed rate.".to_string(),
        proposed_value: value,
        payment_terms: Some("net 30".to_string()),
        confidence,
        requests_escalation: false,
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

#[test]
fn deals_above_ceiling_are_never_eligible() {
    for tier in [CustomerTier::Bronze, CustomerTier::Silver] {
        let strategy = assess(&ctx(150_000.0, tier, RiskLevel::Low));
        assert!(!strategy.ai_eligible);
        assert!(strategy.reasons.iter().any(|r| r.contains("ceiling")));
    }
}

#[test]
fn small_simple_bronze_deal_is_eligible() {
    let strategy = assess(&ctx(5_000.0, CustomerTier::Bronze, RiskLevel::Low));
    assert!(strategy.ai_eligible);
    assert_eq!(strategy.confidence_score, 100);
    assert_eq!(strategy.approach, Approach::ValueOptimization);
    assert_eq!(strategy.max_concession_pct, 7);
    assert!(strategy.reasons.is_empty());
}

#[test]
fn complex_deal_with_many_stakeholders_is_forced_to_escalate() {
    let base = NegotiationContext::new(
        20_000.0,
        Complexity::Complex,
        Timeline::Weeks,
        RiskLevel::Medium,
        CustomerTier::Silver,
    );

    // 100 - 40 = 60 clears the threshold on its own.
    let few = assess(&base.clone().stakeholders(2));
    assert_eq!(few.confidence_score, 60);
    assert!(few.ai_eligible);

    let many = assess(&base.stakeholders(4));
    assert_eq!(many.confidence_score, 60);
    assert!(!many.ai_eligible);
}

#[test]
fn immediate_timeline_on_large_deal_escalates() {
    let c = NegotiationContext::new(
        30_000.0,
        Complexity::Simple,
        Timeline::Immediate,
        RiskLevel::Low,
        CustomerTier::Bronze,
    );
    let strategy = assess(&c);
    assert!(!strategy.ai_eligible);
    assert_eq!(strategy.approach, Approach::ExpeditedSolution);

    let small = NegotiationContext { deal_value: 20_000.0, ..c };
    assert!(assess(&small).ai_eligible);
}

#[test]
fn low_confidence_is_not_eligible_and_score_is_clamped() {
    let c = NegotiationContext::new(
        90_000.0,
        Complexity::Complex,
        Timeline::Weeks,
        RiskLevel::High,
        CustomerTier::Gold,
    );
    let strategy = assess(&c);
    assert_eq!(strategy.confidence_score, 0);
    assert!(!strategy.ai_eligible);
    assert!(strategy.reasons.iter().any(|r| r.contains("below 60")));
}

#[test]
fn approach_follows_priority_order() {
    let cases = [
        (ctx(5_000.0, CustomerTier::Platinum, RiskLevel::High), Approach::PremiumServiceFocus),
        (ctx(5_000.0, CustomerTier::Silver, RiskLevel::High), Approach::ValueOptimization),
        (ctx(20_000.0, CustomerTier::Silver, RiskLevel::High), Approach::RiskMitigation),
        (
            ctx(20_000.0, CustomerTier::Silver, RiskLevel::Medium),
            Approach::CollaborativeProblemSolving,
        ),
    ];
    for (c, expected) in cases {
        assert_eq!(assess(&c).approach, expected, "{c:?}");
    }
}

#[test]
fn concession_depends_on_size_tier_and_risk() {
    assert_eq!(assess(&ctx(60_000.0, CustomerTier::Silver, RiskLevel::Medium)).max_concession_pct, 3);
    assert_eq!(assess(&ctx(20_000.0, CustomerTier::Gold, RiskLevel::Medium)).max_concession_pct, 6);
    assert_eq!(assess(&ctx(20_000.0, CustomerTier::Platinum, RiskLevel::Low)).max_concession_pct, 9);

    for deal in [1_000.0, 60_000.0, 500_000.0] {
        for tier in [CustomerTier::Bronze, CustomerTier::Platinum] {
            for risk in [RiskLevel::Low, RiskLevel::High] {
                let pct = assess(&ctx(deal, tier, risk)).max_concession_pct;
                assert!(pct <= MAX_CONCESSION_PCT);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Proposal validation
// ---------------------------------------------------------------------------

#[test]
fn proposal_within_limits_passes() {
    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    validate_proposal(&proposal(8_500.0, 80.0), &c).unwrap();
}

#[test]
fn excessive_discount_is_rejected() {
    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let err = validate_proposal(&proposal(7_500.0, 90.0), &c).unwrap_err();
    match err {
        Error::ValidationFailed(violations) => {
            assert_eq!(violations.len(), 1);
            assert!(violations[0].contains("discount"), "{violations:?}");
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn extended_terms_need_approval() {
    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let p = NegotiationProposal {
        payment_terms: Some("Net 60".to_string()),
        ..proposal(9_500.0, 85.0)
    };
    assert!(validate_proposal(&p, &c).is_err());
    validate_proposal(&p, &c.extended_terms_approved(true)).unwrap();
}

#[test]
fn extended_terms_are_caught_in_any_spelling() {
    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let with_terms = |terms: &str| NegotiationProposal {
        payment_terms: Some(terms.to_string()),
        ..proposal(9_500.0, 85.0)
    };

    for terms in ["Net-60", "NET-90", "net90", "net 90 days", "60-day terms", "90 days"] {
        assert!(validate_proposal(&with_terms(terms), &c).is_err(), "{terms}");
    }
    for terms in ["net 30", "Net-15", "due on receipt", "net 600"] {
        validate_proposal(&with_terms(terms), &c).unwrap();
    }
}

#[test]
fn every_violation_is_reported() {
    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let p = NegotiationProposal {
        requests_escalation: true,
        ..proposal(12_000.0, 50.0)
    };
    match validate_proposal(&p, &c).unwrap_err() {
        Error::ValidationFailed(violations) => assert_eq!(violations.len(), 3, "{violations:?}"),
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Escalation package
// ---------------------------------------------------------------------------

#[test]
fn urgency_levels() {
    let immediate = NegotiationContext::new(
        40_000.0,
        Complexity::Simple,
        Timeline::Immediate,
        RiskLevel::Low,
        CustomerTier::Bronze,
    );
    assert_eq!(urgency(&immediate), Urgency::High);
    assert_eq!(urgency(&ctx(1_000.0, CustomerTier::Platinum, RiskLevel::Low)), Urgency::High);
    assert_eq!(urgency(&ctx(80_000.0, CustomerTier::Silver, RiskLevel::Low)), Urgency::Medium);
    assert_eq!(urgency(&ctx(30_000.0, CustomerTier::Silver, RiskLevel::Low)), Urgency::Low);
}

#[test]
fn handoff_package_carries_context_and_risks() {
    let c = NegotiationContext::new(
        150_000.0,
        Complexity::Complex,
        Timeline::Days,
        RiskLevel::High,
        CustomerTier::Gold,
    )
    .stakeholders(5);
    let strategy = assess(&c);
    let package = HandoffPackage::build("need a better rate", &c, &strategy, "too big".to_string());

    assert_eq!(package.original_request, "need a better rate");
    assert_eq!(package.reason, "too big");
    assert_eq!(package.risk_factors, risk_factors(&c));
    assert!(package.risk_factors.iter().any(|f| f.contains("5 stakeholders")));
    assert!(!package.suggested_approach.is_empty());
    assert!(!package.ai_pre_analysis.is_empty());
}

// ---------------------------------------------------------------------------
// Negotiation service
// ---------------------------------------------------------------------------

fn negotiation(
    upstream: Arc<dyn Upstream>,
) -> (Arc<BatchService>, NegotiationService, Arc<RecordingNotifier>) {
    let batch = service(test_config(), upstream);
    batch.start();
    let notifier = Arc::new(RecordingNotifier::default());
    let svc = NegotiationService::new(Arc::clone(&batch), notifier.clone());
    (batch, svc, notifier)
}

#[tokio::test(start_paused = true)]
async fn ineligible_deal_escalates_without_calling_upstream() {
    let upstream = FixedUpstream::new(json!("unused"));
    let (batch, svc, notifier) = negotiation(upstream.clone());

    let c = ctx(120_000.0, CustomerTier::Silver, RiskLevel::Low);
    let outcome = svc.negotiate("can you beat this quote?", &c).await;

    assert!(!outcome.success);
    assert!(outcome.escalated);
    assert_eq!(outcome.response, ESCALATION_MESSAGE);
    assert_eq!(outcome.audit_trail.len(), 1);
    assert!(outcome.handoff.is_some());
    assert_eq!(upstream.call_count(), 0);
    assert_eq!(batch.usage_stats().queue_size, 0);

    let packages = notifier.packages();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].context.deal_value, 120_000.0);

    assert!(batch.events_since(0).iter().any(|e| matches!(
        e.kind,
        EventKind::NegotiationEscalated { deal_value, .. } if deal_value == 120_000.0
    )));
    batch.stop().await;
}

#[tokio::test(start_paused = true)]
async fn valid_proposal_is_returned() {
    let reply = r#"Here you go: {"message": "We can move your lanes at 9,200.", "proposed_value": 9200, "payment_terms": "net 30", "confidence": 88}"#;
    let upstream = FixedUpstream::new(json!(reply));
    let (batch, svc, notifier) = negotiation(upstream.clone());

    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let outcome = svc.negotiate("rate for two lanes", &c).await;

    assert!(outcome.success, "{outcome:?}");
    assert!(!outcome.escalated);
    assert_eq!(outcome.response, "We can move your lanes at 9,200.");
    assert_eq!(outcome.proposal.unwrap().proposed_value, 9200.0);
    assert!(outcome.cost > 0.0);
    assert_eq!(upstream.call_count(), 1);
    assert!(notifier.packages().is_empty());
    batch.stop().await;
}

#[tokio::test(start_paused = true)]
async fn deep_discount_proposal_is_escalated() {
    let upstream = FixedUpstream::new(json!({
        "message": "Take 25% off.",
        "proposed_value": 7500,
        "payment_terms": "net 30",
        "confidence": 95
    }));
    let (batch, svc, notifier) = negotiation(upstream);

    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let outcome = svc.negotiate("lower please", &c).await;

    assert!(outcome.escalated);
    assert!(!outcome.success);
    assert_eq!(outcome.proposal.unwrap().proposed_value, 7500.0);
    assert!(outcome.handoff.unwrap().reason.contains("discount"));
    assert_eq!(notifier.packages().len(), 1);
    batch.stop().await;
}

#[tokio::test(start_paused = true)]
async fn upstream_failure_is_escalated() {
    let (batch, svc, _notifier) = negotiation(Arc::new(FailingUpstream));

    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let outcome = svc.negotiate("lower please", &c).await;

    assert!(outcome.escalated);
    assert!(outcome.handoff.unwrap().reason.contains("failed"));
    batch.stop().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_proposal_is_escalated() {
    let (batch, svc, _notifier) = negotiation(FixedUpstream::new(json!("sure, sounds good")));

    let c = ctx(10_000.0, CustomerTier::Silver, RiskLevel::Low);
    let outcome = svc.negotiate("lower please", &c).await;

    assert!(outcome.escalated);
    assert!(outcome.proposal.is_none());
    batch.stop().await;
}
