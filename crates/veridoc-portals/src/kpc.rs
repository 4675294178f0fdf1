//! 한국생산성본부 (Korea Productivity Center)
//!
//! license.kpc.or.kr takes name, 8-digit birth, and a dash-free license
//! code. A miss renders an explicit "no matching data" notice; a hit renders
//! a result table whose "자격종목" row names the certificate subject.

use crate::adapter::{credential_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;
use veridoc_browser::capture_page;
use veridoc_core::normalize::{normalize_birth, strip_dashes};
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str =
    "https://license.kpc.or.kr/nasec/psexamcrqfccnfirm/crqfreqst/selectQualftruflscnfirm.do";

const SUBMIT_BUTTON: &str = "button.btn.btn_xl.col-12-s.bg_red.text_color_white";
const NO_MATCH_NOTICE: &str =
    "div.article.content_panel.option-row dl.text_info_list01 dt";

pub struct KpcAdapter;

#[async_trait]
impl SiteAdapter for KpcAdapter {
    fn institution(&self) -> &'static str {
        "한국생산성본부"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let birth_raw = item
            .birth
            .as_deref()
            .ok_or_else(|| VeridocError::MissingField("birth".to_string()))?;
        let birth = normalize_birth(birth_raw)?;
        let license_code = strip_dashes(&item.pass_num_trimmed());
        if license_code.is_empty() {
            return Err(VeridocError::MissingField("passNum".to_string()));
        }

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;

        session.fill_field("#userKName", item.name.trim()).await?;
        session.fill_field("#ipinBirth", &birth).await?;
        session.fill_field("#licenseCode", &license_code).await?;

        session.click(SUBMIT_BUTTON).await?;
        session.settle(ctx.budget.outcome_wait()).await;

        let notice = session.text_content(NO_MATCH_NOTICE).await?;
        let fields: HashMap<String, String> = serde_json::from_value(
            session
                .evaluate_script(
                    "(() => { \
                       const table = document.querySelector('div.table-add'); \
                       if (!table) return {}; \
                       const data = {}; \
                       for (const row of table.querySelectorAll('tbody tr')) { \
                         const key = row.querySelector('th span')?.textContent.trim(); \
                         const value = row.querySelector('td')?.textContent.trim(); \
                         if (key && value) data[key] = value; \
                       } \
                       return data; \
                     })()",
                )
                .await?,
        )
        .unwrap_or_default();

        match classify_kpc_result(&notice, &fields) {
            KpcResult::Confirmed(subject) => {
                let image = capture_page(session, false).await?;
                info!("{}: confirmed ({subject})", item.name);
                Ok(Outcome::Confirmed {
                    subs: Some(subject),
                    date: None,
                    evidence: Evidence::new(
                        credential_evidence_path(self.institution(), item),
                        image,
                    ),
                })
            }
            KpcResult::NoMatch => {
                info!("{}: no matching license data", item.name);
                Ok(Outcome::NotFound)
            }
            KpcResult::Unrecognized => Ok(Outcome::Indeterminate(
                "결과 테이블을 찾을 수 없습니다".to_string(),
            )),
        }
    }
}

#[derive(Debug, PartialEq)]
enum KpcResult {
    Confirmed(String),
    NoMatch,
    Unrecognized,
}

fn classify_kpc_result(notice: &str, fields: &HashMap<String, String>) -> KpcResult {
    if notice.contains("입력내용과 일치하는 자료가 없습니다") {
        return KpcResult::NoMatch;
    }
    match fields.get("자격종목") {
        Some(subject) => KpcResult::Confirmed(subject.clone()),
        None => KpcResult::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_notice_wins() {
        let result = classify_kpc_result(
            "입력내용과 일치하는 자료가 없습니다. 다시 확인해 주세요.",
            &HashMap::new(),
        );
        assert_eq!(result, KpcResult::NoMatch);
    }

    #[test]
    fn test_subject_row_confirms() {
        let mut fields = HashMap::new();
        fields.insert("자격종목".to_string(), "ERP 정보관리사 회계 1급".to_string());
        assert_eq!(
            classify_kpc_result("", &fields),
            KpcResult::Confirmed("ERP 정보관리사 회계 1급".to_string())
        );
    }

    #[test]
    fn test_neither_signal_is_unrecognized() {
        assert_eq!(classify_kpc_result("", &HashMap::new()), KpcResult::Unrecognized);
    }
}
