//! 국민연금공단 가입자증명 진위확인 (nps.or.kr)
//!
//! The only portal that wants three credentials: a dash-free issuance
//! number, the issuance date in `yyyy-MM-dd`, and a separate verification
//! code. The outcome signal is the page's top message box.

use crate::adapter::{named_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use tracing::info;
use veridoc_browser::capture_page;
use veridoc_core::normalize::{normalize_issued_date, strip_dashes};
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str = "https://nps.or.kr/elctcvlcpt/etc/getOHAC0065M0.do";

const SEARCH_LINK: &str = r#"a[href="javascript:fncSearch();"]"#;

pub struct NpsAdapter;

#[async_trait]
impl SiteAdapter for NpsAdapter {
    fn institution(&self) -> &'static str {
        "국민연금가입자증명"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let issue_no = strip_dashes(&item.pass_num_trimmed());
        if issue_no.is_empty() {
            return Err(VeridocError::MissingField("passNum".to_string()));
        }
        let issued_date = normalize_issued_date(
            item.issued_date
                .as_deref()
                .ok_or_else(|| VeridocError::MissingField("issuedDate".to_string()))?,
        )?;
        let verify_code = item
            .extra_num
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VeridocError::MissingField("extraNum (검증번호)".to_string()))?;

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;

        session.fill_field("#issuNo", &issue_no).await?;
        session.fill_field("#issuYmd", &issued_date).await?;
        session.fill_field("#whcfVrfcNo", &verify_code).await?;

        session.click(SEARCH_LINK).await?;
        session.settle(ctx.budget.outcome_wait()).await;

        let message = session.text_content(".top-msg-box").await?;

        if is_issuance_confirmed(&message) {
            let image = capture_page(session, true).await?;
            info!("{}: issuance confirmed", item.name);
            Ok(Outcome::Confirmed {
                subs: None,
                date: Some(issued_date),
                evidence: Evidence::new(
                    named_evidence_path(self.institution(), item),
                    image,
                ),
            })
        } else {
            info!("{}: no matching issuance", item.name);
            Ok(Outcome::NotFound)
        }
    }
}

fn is_issuance_confirmed(message: &str) -> bool {
    message.contains("발급하셨습니다")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_phrase() {
        assert!(is_issuance_confirmed(
            "2024-01-05에 가입자증명을 발급하셨습니다."
        ));
        assert!(!is_issuance_confirmed("일치하는 발급 내역이 없습니다."));
        assert!(!is_issuance_confirmed(""));
    }
}
