//! 국민건강보험공단 자격득실확인서 진위확인 (nhis.or.kr)
//!
//! The portal answers through an alert modal rather than a result page. The
//! verify button is rendered conditionally, so the click goes through page
//! JavaScript once the button is actually visible.

use crate::adapter::{document_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;
use veridoc_browser::capture_page;
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str = "https://www.nhis.or.kr/nhis/minwon/jpAeb00101.do";

const MODAL_MESSAGE: &str = "#common-ALERT-modal #modal-message";
/// The shared modal container sits in the DOM hidden from page load; only
/// visibility means the verdict has rendered.
const MODAL_VISIBLE: &str =
    "(() => { const m = document.querySelector('#common-ALERT-modal'); \
      return !!(m && m.offsetParent !== null); })()";
const VERIFY_BUTTON_VISIBLE: &str =
    "(() => { const c = document.querySelector('#buttonControl2'); \
      if (!c) return false; const b = c.querySelector('#imgNhic'); \
      return !!(b && b.offsetParent !== null); })()";

pub struct NhisAdapter;

#[async_trait]
impl SiteAdapter for NhisAdapter {
    fn institution(&self) -> &'static str {
        "건강보험자격득실확인서"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let pass_num = item.pass_num_trimmed();
        if pass_num.is_empty() {
            return Err(VeridocError::MissingField("passNum".to_string()));
        }

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;

        // Certificate-type radio, then the issuance number
        session
            .wait_for_element("#r02", Some(Duration::from_secs(10)))
            .await?;
        session.click("#r02").await?;
        session.fill_field("#docRefCopy", &pass_num).await?;

        // The button only becomes clickable once the portal's own scripts
        // finish wiring it up
        session
            .wait_for_condition(VERIFY_BUTTON_VISIBLE, Duration::from_secs(30))
            .await?;
        session.click_via_script("#buttonControl2 #imgNhic").await?;

        session
            .wait_for_condition(MODAL_VISIBLE, ctx.budget.extended(7000))
            .await?;
        let message = session.text_content(MODAL_MESSAGE).await?;

        let outcome = match classify_modal_message(&message) {
            ModalVerdict::Issued => {
                let image = capture_page(session, false).await?;
                info!("{}: issuance history confirmed", item.name);
                Outcome::Confirmed {
                    subs: None,
                    date: None,
                    evidence: Evidence::new(
                        document_evidence_path(self.institution(), item),
                        image,
                    ),
                }
            }
            ModalVerdict::NeverIssued => {
                info!("{}: no issuance record", item.name);
                Outcome::NotFound
            }
            ModalVerdict::Unexpected => Outcome::Indeterminate(format!(
                "예상하지 못한 응답: {}",
                message.trim()
            )),
        };

        // Close the modal so the session tears down cleanly
        let _ = session.click_via_script("#modal-confirm").await;

        Ok(outcome)
    }
}

#[derive(Debug, PartialEq)]
enum ModalVerdict {
    Issued,
    NeverIssued,
    Unexpected,
}

fn classify_modal_message(message: &str) -> ModalVerdict {
    if message.contains("발급받은 이력이 있습니다") {
        ModalVerdict::Issued
    } else if message.contains("발급받은 사실이 없습니다") {
        ModalVerdict::NeverIssued
    } else {
        ModalVerdict::Unexpected
    }
}
