//! gov.kr 발급문서 진위확인 (issued-document confirmation)
//!
//! The one adapter whose confirmation spans two rendering surfaces: the
//! confirmation form on the primary page and a document viewer that opens in
//! a popup tab. Evidence is the two captures composed side by side.
//!
//! Several document types (초본, 등본, 성적증명서, ...) share this flow, and
//! the two fan-out institutions land here when their pass number carries the
//! four-group document shape.

use crate::adapter::{document_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use headless_chrome::Tab;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use veridoc_browser::{capture_page, capture_tab, compose_side_by_side};
use veridoc_core::normalize::split_doc_number;
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str = "https://www.gov.kr/mw/EgovPageLink.do?link=confirm/AA040_confirm_id";

/// Popup shown when the document number matches nothing
const FAILURE_POPUP: &str = r#"#mw_pop_01[style*="block"]"#;
/// Marker for the second confirmation step
const NAME_STEP_MARKER: &str = r#"input[name="doc_ref_key_element"]"#;
/// Link that opens the document viewer tab
const VIEW_DOC_LINK: &str = r#"a[onclick*="view_doc"]"#;

pub struct GovAdapter;

#[async_trait]
impl SiteAdapter for GovAdapter {
    fn institution(&self) -> &'static str {
        "정부24"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let doc_parts = split_doc_number(&item.pass_num_trimmed())?;

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;
        session
            .wait_for_element(".option_box", Some(Duration::from_secs(10)))
            .await?;

        // Document-confirmation mode, unless already selected
        let checked = session
            .evaluate_script(
                "(() => { const el = document.querySelector('#issue_type1'); \
                  return !!(el && el.checked); })()",
            )
            .await?;
        if checked.as_bool() != Some(true) {
            session.click("#issue_type1").await?;
        }

        for (i, part) in doc_parts.iter().enumerate() {
            session
                .fill_field(&format!("#doc_ref_no{}", i + 1), part)
                .await?;
        }

        session
            .wait_for_element("#btn_end", Some(Duration::from_secs(10)))
            .await?;
        session.click("#btn_end").await?;

        // A failure popup inside the budget means no such document; its
        // absence means the name step is coming.
        if session
            .wait_for_element(FAILURE_POPUP, Some(ctx.budget.outcome_wait()))
            .await
            .is_ok()
        {
            info!("{}: 문서 없음", item.name);
            return Ok(Outcome::NotFound);
        }

        // Second step: the requester's name, then re-confirm
        session
            .wait_for_element(NAME_STEP_MARKER, Some(Duration::from_secs(10)))
            .await?;
        session.fill_field("#doc_ref_key", item.name.trim()).await?;
        session
            .wait_for_element("#btn_end", Some(Duration::from_secs(10)))
            .await?;
        session.click("#btn_end").await?;

        // Issuance summary is the first evidence surface
        session
            .wait_for_element("form#form1", Some(Duration::from_secs(10)))
            .await?;
        let primary = capture_page(session, false).await?;
        debug!("{}: captured confirmation surface", item.name);

        // The document viewer opens in its own tab. Snapshot the targets
        // first; Chrome's initial blank page is in that list too.
        session
            .wait_for_element(VIEW_DOC_LINK, Some(Duration::from_secs(10)))
            .await?;
        let known_tabs = session.target_ids()?;
        session.click(VIEW_DOC_LINK).await?;

        let viewer = session
            .wait_for_new_tab(&known_tabs, ctx.budget.extended(3000))
            .await?;
        wait_for_tab_ready(&viewer, Duration::from_secs(20)).await?;
        viewer
            .wait_for_element_with_custom_timeout("#viewerFrame", Duration::from_secs(20))
            .map_err(|_| {
                VeridocError::Browser("Document viewer frame never appeared".to_string())
            })?;
        // The frame reports ready before the PDF layer finishes painting
        session.settle(ctx.budget.extended(1500)).await;

        let secondary = capture_tab(&viewer, false).await?;
        debug!("{}: captured viewer surface", item.name);

        // Intermediates exist only in memory; the composite is the evidence
        let image = compose_side_by_side(&primary, &secondary)?;
        info!("{}: confirmed with composite evidence", item.name);

        Ok(Outcome::Confirmed {
            subs: None,
            date: None,
            evidence: Evidence::new(
                document_evidence_path(item.institution.trim(), item),
                image,
            ),
        })
    }
}

/// Poll a popup tab until its document reports complete.
async fn wait_for_tab_ready(tab: &Arc<Tab>, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let ready = tab
            .evaluate("document.readyState === 'complete'", false)
            .ok()
            .and_then(|r| r.value)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if ready {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(VeridocError::Browser(format!(
                "Popup tab not ready within {timeout:?}"
            )));
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
