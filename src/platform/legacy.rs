//! Adapter for callers still using the per-service AI API.
//!
//! Each legacy service name maps to one task kind and default priority in a
//! static table; calls are forwarded to the orchestrator.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Priority, TaskKind};

use super::{PlatformOrchestrator, RequestContext, ResponseEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyService {
    EmailAnalyzer,
    LeadQualifier,
    ContractReviewer,
    MeetingScheduler,
    SalesCaller,
    Negotiator,
    SupportAgent,
}

static TABLE: [(&str, LegacyService, TaskKind, Priority); 7] = [
    ("email_analyzer", LegacyService::EmailAnalyzer, TaskKind::EmailAnalysis, Priority::Low),
    ("lead_qualifier", LegacyService::LeadQualifier, TaskKind::LeadQualification, Priority::Medium),
    ("contract_reviewer", LegacyService::ContractReviewer, TaskKind::ContractReview, Priority::Medium),
    ("meeting_scheduler", LegacyService::MeetingScheduler, TaskKind::Scheduling, Priority::Low),
    ("sales_caller", LegacyService::SalesCaller, TaskKind::SalesCall, Priority::High),
    ("negotiator", LegacyService::Negotiator, TaskKind::Negotiation, Priority::High),
    ("support_agent", LegacyService::SupportAgent, TaskKind::CustomerSupport, Priority::Medium),
];

impl LegacyService {
    pub fn from_name(name: &str) -> Option<Self> {
        TABLE.iter().find(|(n, ..)| *n == name).map(|(_, s, ..)| *s)
    }

    fn entry(self) -> &'static (&'static str, LegacyService, TaskKind, Priority) {
        // Every variant has exactly one row.
        TABLE
            .iter()
            .find(|(_, s, ..)| *s == self)
            .unwrap_or(&TABLE[0])
    }

    pub fn name(self) -> &'static str {
        self.entry().0
    }

    pub fn task_kind(self) -> TaskKind {
        self.entry().2
    }

    pub fn default_priority(self) -> Priority {
        self.entry().3
    }
}

pub struct LegacyAdapter {
    orchestrator: Arc<PlatformOrchestrator>,
}

impl LegacyAdapter {
    pub fn new(orchestrator: Arc<PlatformOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Forward a legacy call by service name.
    ///
    /// # Errors
    /// [`Error::NotFound`] for a name missing from the table.
    pub async fn call(
        &self,
        service_name: &str,
        content: &str,
        context: &RequestContext,
    ) -> Result<ResponseEnvelope> {
        let service = LegacyService::from_name(service_name)
            .ok_or_else(|| Error::NotFound(format!("legacy service {service_name}")))?;
        Ok(self
            .orchestrator
            .process_request(
                service.task_kind(),
                content,
                context,
                service.default_priority(),
            )
            .await)
    }
}
