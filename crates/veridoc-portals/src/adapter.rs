//! The site adapter contract
//!
//! Every portal runs the same state machine (navigate, fill, submit, await
//! the outcome signal, classify, capture evidence) but each has its own
//! selectors, timing, and signal shape. Adapters return a classified
//! [`Outcome`]; applying it to the work item happens once, at the dispatch
//! boundary.

use async_trait::async_trait;
use std::time::Duration;
use veridoc_browser::BrowserSession;
use veridoc_core::{Outcome, Result, VeridocConfig, WorkItem};

/// Per-portal wait tuning. The base budget bounds every post-submit outcome
/// wait; portals known to render slowly get an extended budget from dispatch.
#[derive(Debug, Clone, Copy)]
pub struct DelayBudget {
    base: Duration,
}

impl DelayBudget {
    pub fn from_millis(ms: u64) -> Self {
        Self {
            base: Duration::from_millis(ms),
        }
    }

    /// The full budget for an outcome wait.
    pub fn outcome_wait(&self) -> Duration {
        self.base
    }

    /// Budget stretched by a fixed margin, for secondary surfaces (popup
    /// tabs, embedded viewers) that start rendering only after the primary
    /// outcome arrived.
    pub fn extended(&self, extra_ms: u64) -> Duration {
        self.base + Duration::from_millis(extra_ms)
    }
}

/// Everything an adapter may touch during one verification: the item's own
/// browser session, the wait budget, and run configuration (credentials,
/// requester identity).
pub struct AdapterContext<'a> {
    pub session: &'a BrowserSession,
    pub budget: DelayBudget,
    pub config: &'a VeridocConfig,
}

/// One institution's verification protocol.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Institution label, used for logging and evidence foldering.
    fn institution(&self) -> &'static str;

    /// Drive the portal for one item and classify the outcome.
    ///
    /// Implementations return errors freely (`Format`, `Browser`,
    /// `MissingField`); the dispatch boundary absorbs them into a failed
    /// item. Nothing here aborts a batch.
    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome>;
}

/// Archive path for a credential-portal evidence image:
/// `자격증/<institution>/<registration>_<certificate>.png`.
pub fn credential_evidence_path(institution: &str, item: &WorkItem) -> String {
    format!(
        "자격증/{institution}/{}_{}.png",
        item.registration_number, item.certificate_name
    )
}

/// Archive path for document-confirmation evidence:
/// `<document type>/<registration>_<certificate>.png`.
pub fn document_evidence_path(folder: &str, item: &WorkItem) -> String {
    format!(
        "{folder}/{}_{}.png",
        item.registration_number, item.certificate_name
    )
}

/// Archive path variant that keys the file by the person's name as well,
/// for portals where registration numbers alone collide across people.
pub fn named_evidence_path(folder: &str, item: &WorkItem) -> String {
    format!(
        "{folder}/{}_{}_{}.png",
        item.registration_number, item.name, item.certificate_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_extension() {
        let budget = DelayBudget::from_millis(3000);
        assert_eq!(budget.outcome_wait(), Duration::from_millis(3000));
        assert_eq!(budget.extended(2000), Duration::from_millis(5000));
    }

    #[test]
    fn test_evidence_paths_are_identity_derived() {
        let mut item = WorkItem::new("홍길동", "한국세무사회");
        item.registration_number = "20240001".to_string();
        item.certificate_name = "전산세무2급".to_string();

        assert_eq!(
            credential_evidence_path("한국세무사회", &item),
            "자격증/한국세무사회/20240001_전산세무2급.png"
        );
        assert_eq!(
            document_evidence_path("초본", &item),
            "초본/20240001_전산세무2급.png"
        );
        assert_eq!(
            named_evidence_path("국민연금가입자증명", &item),
            "국민연금가입자증명/20240001_홍길동_전산세무2급.png"
        );
    }
}
