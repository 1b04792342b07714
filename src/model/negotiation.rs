//! Negotiation types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeline {
    Immediate,
    Days,
    Weeks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

macro_rules! display_snake {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $(Self::$variant => $s),+
                };
                f.write_str(s)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = crate::error::Error;

            fn from_str(s: &str) -> crate::error::Result<Self> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(crate::error::Error::Other(format!(
                        concat!("unknown ", stringify!($ty), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

display_snake!(Complexity { Simple => "simple", Medium => "medium", Complex => "complex" });
display_snake!(Timeline { Immediate => "immediate", Days => "days", Weeks => "weeks" });
display_snake!(RiskLevel { Low => "low", Medium => "medium", High => "high" });
display_snake!(CustomerTier {
    Bronze => "bronze",
    Silver => "silver",
    Gold => "gold",
    Platinum => "platinum",
});

/// Everything the policy needs to know about one negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationContext {
    /// Currency units, never negative.
    pub deal_value: f64,
    pub complexity: Complexity,
    /// At least one.
    pub stakeholders: u32,
    pub timeline: Timeline,
    pub risk_level: RiskLevel,
    pub customer_tier: CustomerTier,
    /// Prior free-text entries, oldest first.
    #[serde(default)]
    pub negotiation_history: Vec<String>,
    /// Extended payment terms (net 60/90) were approved separately.
    #[serde(default)]
    pub extended_terms_approved: bool,
}

impl NegotiationContext {
    pub fn new(
        deal_value: f64,
        complexity: Complexity,
        timeline: Timeline,
        risk_level: RiskLevel,
        customer_tier: CustomerTier,
    ) -> Self {
        Self {
            deal_value: deal_value.max(0.0),
            complexity,
            stakeholders: 1,
            timeline,
            risk_level,
            customer_tier,
            negotiation_history: Vec::new(),
            extended_terms_approved: false,
        }
    }

    pub fn stakeholders(mut self, n: u32) -> Self {
        self.stakeholders = n.max(1);
        self
    }

    pub fn history(mut self, entry: impl Into<String>) -> Self {
        self.negotiation_history.push(entry.into());
        self
    }

    pub fn extended_terms_approved(mut self, approved: bool) -> Self {
        self.extended_terms_approved = approved;
        self
    }
}

/// Negotiation playbook chosen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    PremiumServiceFocus,
    ExpeditedSolution,
    ValueOptimization,
    RiskMitigation,
    CollaborativeProblemSolving,
}

display_snake!(Approach {
    PremiumServiceFocus => "premium_service_focus",
    ExpeditedSolution => "expedited_solution",
    ValueOptimization => "value_optimization",
    RiskMitigation => "risk_mitigation",
    CollaborativeProblemSolving => "collaborative_problem_solving",
});

/// Output of the policy's assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationStrategy {
    pub ai_eligible: bool,
    pub approach: Approach,
    pub max_concession_pct: u32,
    /// 0..=100.
    pub confidence_score: u32,
    pub reasons: Vec<String>,
}

/// What the model proposes for a negotiation, as returned in the task result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationProposal {
    /// Message to send to the customer.
    pub message: String,
    /// Proposed deal value after concessions.
    pub proposed_value: f64,
    #[serde(default)]
    pub payment_terms: Option<String>,
    /// Model's self-reported confidence, 0..=100.
    pub confidence: f64,
    #[serde(default)]
    pub requests_escalation: bool,
}

impl NegotiationProposal {
    /// Discount implied by the proposal as a percentage of `deal_value`.
    pub fn implied_discount_pct(&self, deal_value: f64) -> f64 {
        if deal_value <= 0.0 {
            return 0.0;
        }
        (deal_value - self.proposed_value) / deal_value * 100.0
    }
}
