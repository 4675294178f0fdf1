//! Work item dispatch
//!
//! Maps an item's declared institution to the adapter that can verify it,
//! then runs that adapter inside the absorbing boundary: whatever goes wrong
//! past this point becomes a failed item, never a failed batch.

use crate::adapter::{AdapterContext, DelayBudget, SiteAdapter};
use crate::{dataq, gov, historyexam, korcham, kpc, nhis, nps, opic, semu};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};
use veridoc_browser::{BrowserConfig, BrowserSession};
use veridoc_core::normalize::institution_key;
use veridoc_core::{apply_outcome, Result, VeridocConfig, VeridocError, WorkItem};

/// Fixed margin added to the delay budget for the gov.kr document viewer,
/// which keeps rendering well after the primary page settles.
const GOV_EXTRA_DELAY_MS: u64 = 2000;

/// Identifies one concrete adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// 한국세무사회 (tax accountants association)
    Semu,
    /// 대한상공회의소 (chamber of commerce)
    Korcham,
    /// 국사편찬위원회 (Korean history exam)
    HistoryExam,
    /// 한국생산성본부 (productivity center)
    Kpc,
    /// OPIc language certificate
    Opic,
    /// gov.kr issued-document confirmation
    Gov,
    /// 국민건강보험공단 (health insurance service)
    Nhis,
    /// 국민연금공단 (national pension service)
    Nps,
    /// 한국데이터산업진흥원 (data industry agency)
    Dataq,
}

impl AdapterKind {
    pub fn adapter(&self) -> &'static dyn SiteAdapter {
        match self {
            AdapterKind::Semu => &semu::SemuAdapter,
            AdapterKind::Korcham => &korcham::KorchamAdapter,
            AdapterKind::HistoryExam => &historyexam::HistoryExamAdapter,
            AdapterKind::Kpc => &kpc::KpcAdapter,
            AdapterKind::Opic => &opic::OpicAdapter,
            AdapterKind::Gov => &gov::GovAdapter,
            AdapterKind::Nhis => &nhis::NhisAdapter,
            AdapterKind::Nps => &nps::NpsAdapter,
            AdapterKind::Dataq => &dataq::DataqAdapter,
        }
    }

    /// Budget for this adapter, derived from the configured base delay.
    fn budget(&self, config: &VeridocConfig) -> DelayBudget {
        match self {
            // The gov.kr confirmation flow is the slowest of the portals
            AdapterKind::Gov => DelayBudget::from_millis(config.delay_ms + GOV_EXTRA_DELAY_MS),
            _ => DelayBudget::from_millis(config.delay_ms),
        }
    }
}

/// How a normalized institution key routes.
enum Route {
    Single(AdapterKind),
    /// Two portals satisfy the same document request; a four-group document
    /// number selects the gov.kr confirmation flow, anything else goes to
    /// the institution's own portal.
    DocNumberOrPortal(AdapterKind),
}

/// Static routing table, keyed by [`institution_key`]-normalized labels.
/// gov.kr handles several distinct document types under one adapter.
static ROUTES: &[(&str, Route)] = &[
    ("한국세무사회", Route::Single(AdapterKind::Semu)),
    ("대한상공회의소", Route::Single(AdapterKind::Korcham)),
    ("국사편찬위원회", Route::Single(AdapterKind::HistoryExam)),
    ("한국생산성본부", Route::Single(AdapterKind::Kpc)),
    ("opic", Route::Single(AdapterKind::Opic)),
    ("한국데이터산업진흥원", Route::Single(AdapterKind::Dataq)),
    ("초본", Route::Single(AdapterKind::Gov)),
    ("등본", Route::Single(AdapterKind::Gov)),
    ("성적증명서", Route::Single(AdapterKind::Gov)),
    ("졸업증명서", Route::Single(AdapterKind::Gov)),
    ("어학성적사전등록확인서", Route::Single(AdapterKind::Gov)),
    (
        "건강보험자격득실확인서",
        Route::DocNumberOrPortal(AdapterKind::Nhis),
    ),
    (
        "국민연금가입자증명",
        Route::DocNumberOrPortal(AdapterKind::Nps),
    ),
];

/// The four-group document number shape issued by gov.kr
/// (e.g. `1730-3002-0530-3240`).
fn doc_number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{4}$").expect("valid pattern"))
}

/// Resolve an item to its adapter. Pure in (institution, pass-num shape):
/// the same inputs always select the same adapter.
///
/// Fan-out rule: for the two institutions whose documents can also be
/// confirmed on gov.kr, a pass number matching the exact four-group pattern
/// routes there; any other value (including a malformed dashed one) routes
/// to the institution portal, whose own format validation reports it.
pub fn resolve(item: &WorkItem) -> Result<AdapterKind> {
    let key = institution_key(&item.institution);
    let route = ROUTES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, route)| route)
        .ok_or_else(|| VeridocError::UnknownInstitution(item.institution.trim().to_string()))?;

    Ok(match route {
        Route::Single(kind) => *kind,
        Route::DocNumberOrPortal(portal) => {
            if doc_number_pattern().is_match(&item.pass_num_trimmed()) {
                AdapterKind::Gov
            } else {
                *portal
            }
        }
    })
}

/// Verify one item end to end: resolve, provision a browser session, run the
/// adapter, classify, tear down.
///
/// The item always comes back with `result` set. The only error this
/// returns is a failed browser launch; resource exhaustion is batch-fatal,
/// everything else is absorbed per item.
pub async fn execute(item: &mut WorkItem, config: &VeridocConfig) -> Result<()> {
    item.institution = item.institution.trim().to_string();

    let kind = match resolve(item) {
        Ok(kind) => kind,
        Err(e) => {
            warn!("{}: routing failed: {}", item.name, e);
            item.mark_failed(e.to_string());
            return Ok(());
        }
    };

    let adapter = kind.adapter();
    info!(
        "{}: dispatching to {} ({:?})",
        item.name,
        adapter.institution(),
        kind
    );

    let session = match BrowserSession::launch_with_config(BrowserConfig::from(config)).await {
        Ok(session) => session,
        Err(e) => {
            // Cannot even start a browser; report up so the batch can stop
            item.mark_failed(e.to_string());
            return Err(e);
        }
    };

    let ctx = AdapterContext {
        session: &session,
        budget: kind.budget(config),
        config,
    };

    match adapter.verify(item, &ctx).await {
        Ok(outcome) => apply_outcome(item, outcome),
        Err(e) => {
            warn!("{}: adapter failed: {}", item.name, e);
            item.mark_failed(e.to_string());
        }
    }

    // Session teardown on every path, success and failure alike
    session.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(institution: &str, pass_num: Option<&str>) -> WorkItem {
        let mut item = WorkItem::new("홍길동", institution);
        item.pass_num = pass_num.map(String::from);
        item
    }

    #[test]
    fn test_single_routes() {
        assert_eq!(
            resolve(&item("한국세무사회", None)).unwrap(),
            AdapterKind::Semu
        );
        assert_eq!(
            resolve(&item("대한상공회의소", None)).unwrap(),
            AdapterKind::Korcham
        );
        assert_eq!(
            resolve(&item("국사편찬위원회", None)).unwrap(),
            AdapterKind::HistoryExam
        );
        assert_eq!(
            resolve(&item("한국생산성본부", None)).unwrap(),
            AdapterKind::Kpc
        );
        assert_eq!(resolve(&item("OPIc", None)).unwrap(), AdapterKind::Opic);
        assert_eq!(
            resolve(&item("한국데이터산업진흥원", None)).unwrap(),
            AdapterKind::Dataq
        );
        assert_eq!(resolve(&item("초본", None)).unwrap(), AdapterKind::Gov);
        assert_eq!(resolve(&item("졸업증명서", None)).unwrap(), AdapterKind::Gov);
    }

    #[test]
    fn test_matching_is_whitespace_and_case_insensitive() {
        assert_eq!(
            resolve(&item(" 한국 세무사회 ", None)).unwrap(),
            AdapterKind::Semu
        );
        assert_eq!(resolve(&item("OPIC", None)).unwrap(), AdapterKind::Opic);
    }

    #[test]
    fn test_fan_out_on_doc_number_shape() {
        // Four-group document number selects the gov.kr confirmation flow
        assert_eq!(
            resolve(&item("건강보험자격득실확인서", Some("1730-3002-0530-3240"))).unwrap(),
            AdapterKind::Gov
        );
        assert_eq!(
            resolve(&item("국민연금가입자증명", Some("1730-3002-0530-3240"))).unwrap(),
            AdapterKind::Gov
        );

        // Anything else goes to the institution portal
        assert_eq!(
            resolve(&item("건강보험자격득실확인서", Some("20240105123456"))).unwrap(),
            AdapterKind::Nhis
        );
        assert_eq!(
            resolve(&item("국민연금가입자증명", Some("1234-567890"))).unwrap(),
            AdapterKind::Nps
        );
        // Malformed dashed numbers are a portal-side format problem, not a
        // reason to reroute
        assert_eq!(
            resolve(&item("건강보험자격득실확인서", Some("1730-3002-0530"))).unwrap(),
            AdapterKind::Nhis
        );
        assert_eq!(
            resolve(&item("국민연금가입자증명", None)).unwrap(),
            AdapterKind::Nps
        );
    }

    #[test]
    fn test_routing_is_deterministic() {
        let probe = item("건강보험자격득실확인서", Some("1730-3002-0530-3240"));
        let first = resolve(&probe).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve(&probe).unwrap(), first);
        }
    }

    #[test]
    fn test_unknown_institution_is_routing_error() {
        let err = resolve(&item("화성협회", None)).unwrap_err();
        assert!(matches!(err, VeridocError::UnknownInstitution(_)));
        assert!(err.to_string().contains("화성협회"));
    }

    #[tokio::test]
    async fn test_execute_absorbs_routing_failure() {
        let mut bad = item("화성협회", None);
        let config = VeridocConfig::default();
        // Routing fails before any browser launch, so this is safe to run
        execute(&mut bad, &config).await.unwrap();
        assert_eq!(bad.result, 0);
        assert!(bad.error.as_deref().unwrap().contains("화성협회"));
        assert!(bad.evidence_path.is_none());
        assert!(bad.evidence_image.is_none());
    }
}
