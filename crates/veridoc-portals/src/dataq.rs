//! 한국데이터산업진흥원 (dataq.or.kr)
//!
//! The check form wants the certificate subject picked from a dropdown (the
//! pass number's first group is the subject code), plus the identity of
//! whoever is asking. Requester fields come from configuration.

use crate::adapter::{credential_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;
use veridoc_browser::capture_page;
use veridoc_core::normalize::split_parts;
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str = "https://www.dataq.or.kr/www/anno/cert/check.do";

pub struct DataqAdapter;

#[async_trait]
impl SiteAdapter for DataqAdapter {
    fn institution(&self) -> &'static str {
        "한국데이터산업진흥원"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let parts = split_parts(&item.pass_num_trimmed(), '-', 2)?;
        let requester = &ctx.config.requester;
        if requester.organization.is_empty() {
            return Err(VeridocError::MissingField(
                "requester identity (config [requester])".to_string(),
            ));
        }

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;

        // Subject dropdown takes the code; change event fires its scripts
        session
            .evaluate_script(&format!(
                "(() => {{ const el = document.querySelector('#class1'); \
                  if (!el) return false; el.value = '{}'; \
                  el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                  return true; }})()",
                parts[0]
            ))
            .await?;

        session.fill_field("#certno", &parts[1]).await?;
        session.fill_field("#name", item.name.trim()).await?;

        session.fill_field("#reqOrg", &requester.organization).await?;
        session.fill_field("#reqUser", &requester.contact_name).await?;
        session.fill_field("#reqTel", &requester.phone).await?;
        session.click("#reqPurps_01").await?;

        session.click("#btnConfirm").await?;
        session.settle(ctx.budget.outcome_wait()).await;

        let no_match = session.text_content("tbody td.no_b_right").await?;
        let fields: HashMap<String, String> = serde_json::from_value(
            session
                .evaluate_script(
                    "(() => { \
                       const tbody = document.querySelector('tbody'); \
                       if (!tbody) return {}; \
                       const data = {}; \
                       for (const row of tbody.querySelectorAll('tr')) { \
                         const key = row.querySelector('th')?.textContent.trim(); \
                         const value = row.querySelector('td')?.textContent.trim(); \
                         if (key && value) data[key] = value; \
                       } \
                       return data; \
                     })()",
                )
                .await?,
        )
        .unwrap_or_default();

        match classify_dataq_result(&no_match, &fields) {
            DataqResult::Confirmed { subject, pass_date } => {
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
            DataqResult::NoMatch => {
                info!("{}: no matching certificate", item.name);
                Ok(Outcome::NotFound)
            }
            DataqResult::Unrecognized => Ok(Outcome::Indeterminate(
                "결과 테이블을 찾을 수 없습니다".to_string(),
            )),
        }
    }
}

#[derive(Debug, PartialEq)]
enum DataqResult {
    Confirmed { subject: String, pass_date: String },
    NoMatch,
    Unrecognized,
}

fn classify_dataq_result(no_match: &str, fields: &HashMap<String, String>) -> DataqResult {
    if no_match.contains("일치하는 인증서 정보가 없습니다") {
        return DataqResult::NoMatch;
    }
    match fields.get("종목") {
        Some(subject) => DataqResult::Confirmed {
            subject: subject.clone(),
            pass_date: fields.get("합격일자").cloned().unwrap_or_default(),
        },
        None => DataqResult::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_populated_table_confirms() {
        let fields = table(&[("종목", "SQLD"), ("합격일자", "2023-09-15")]);
        assert_eq!(
            classify_dataq_result("", &fields),
            DataqResult::Confirmed {
                subject: "SQLD".to_string(),
                pass_date: "2023-09-15".to_string(),
            }
        );
    }

    #[test]
    fn test_no_match_notice() {
        let result =
            classify_dataq_result("입력하신 내용과 일치하는 인증서 정보가 없습니다.", &table(&[]));
        assert_eq!(result, DataqResult::NoMatch);
    }

    #[test]
    fn test_empty_state_is_unrecognized() {
        assert_eq!(
            classify_dataq_result("", &HashMap::new()),
            DataqResult::Unrecognized
        );
    }
}
