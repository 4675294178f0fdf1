//! 대한상공회의소 (Korea Chamber of Commerce and Industry)
//!
//! license.korcham.net gates its truth-check page behind a member login, so
//! this is the one adapter that needs credentials from configuration. The
//! outcome signal is a result list whose entries are `label : value` lines.

use crate::adapter::{credential_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use veridoc_browser::capture_page;
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const LOGIN_URL: &str = "https://license.korcham.net/mb/grplogin.do";
const VERIFY_URL: &str = "https://license.korcham.net/gr/grpLcnsPersonalTruth.do";

/// True only once the login page has been replaced. The login page's own
/// readyState is already `complete` at submit time, so the departure signal
/// has to be the form itself disappearing.
const LOGIN_DEPARTED: &str = "document.querySelector('#upwd') === null";

pub struct KorchamAdapter;

#[async_trait]
impl SiteAdapter for KorchamAdapter {
    fn institution(&self) -> &'static str {
        "대한상공회의소"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let login = ctx.config.korcham.as_ref().ok_or_else(|| {
            VeridocError::MissingField("korcham login credentials (config [korcham])".to_string())
        })?;
        let pass_num = item.pass_num_trimmed();
        if pass_num.is_empty() {
            return Err(VeridocError::MissingField("passNum".to_string()));
        }

        let session = ctx.session;

        // Member login, confirmed with Enter per the portal's form
        session.navigate(LOGIN_URL).await?;
        session.fill_field("#uid", &login.id).await?;
        session.fill_field("#upwd", &login.password).await?;
        session.press_key("Enter").await?;
        // The session cookie arrives with the login response; navigating
        // away before that load lands would discard it
        session.wait_for_navigation().await?;
        session
            .wait_for_condition(LOGIN_DEPARTED, ctx.budget.extended(2000))
            .await?;
        debug!("korcham login completed");

        session.navigate(VERIFY_URL).await?;
        session.fill_field("#name", item.name.trim()).await?;
        session.fill_field("#passNo", &pass_num).await?;
        session.click("a.btn_wh.s.ml5").await?;
        session.settle(ctx.budget.outcome_wait()).await;

        let entries: Vec<String> = serde_json::from_value(
            session
                .evaluate_script(
                    "Array.from(document.querySelectorAll('#result_list > li'))\
                        .map(el => el.textContent.trim())",
                )
                .await?,
        )
        .unwrap_or_default();

        match parse_result_entries(&entries) {
            Some((subject, pass_date)) => {
                // The list highlight renders a beat after the text arrives
                session.settle(Duration::from_millis(300)).await;
                let image = capture_page(session, false).await?;
                info!("{}: confirmed ({subject}, {pass_date})", item.name);
                Ok(Outcome::Confirmed {
                    subs: Some(subject),
                    date: Some(pass_date),
                    evidence: Evidence::new(
                        credential_evidence_path(self.institution(), item),
                        image,
                    ),
                })
            }
            None => {
                info!("{}: no matching license entry", item.name);
                Ok(Outcome::NotFound)
            }
        }
    }
}

/// Extract subject and pass date from `label : value` result entries. The
/// subject entry ("종목명") doubles as the confirmation signal.
fn parse_result_entries(entries: &[String]) -> Option<(String, String)> {
    let subject = labeled_value(entries, "종목명")?;
    let pass_date = labeled_value(entries, "합격일자").unwrap_or_default();
    Some((subject, pass_date))
}

fn labeled_value(entries: &[String], label: &str) -> Option<String> {
    entries
        .iter()
        .find(|e| e.contains(label))
        .and_then(|e| e.split(" : ").nth(1))
        .map(|v| v.trim().to_string())
}
