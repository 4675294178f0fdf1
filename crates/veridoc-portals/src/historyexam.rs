//! 국사편찬위원회 한국사능력검정시험 (Korean history exam)
//!
//! historyexam.go.kr verifies against name, a two-part certificate number,
//! and an 8-digit birth date. The outcome is a th/td table read as a
//! key-value map; "합격여부" is the verdict column.

use crate::adapter::{credential_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;
use veridoc_browser::capture_page;
use veridoc_core::normalize::{normalize_birth, split_parts};
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str = "https://www.historyexam.go.kr/etcPageLink.do?link=trueChk";

pub struct HistoryExamAdapter;

#[async_trait]
impl SiteAdapter for HistoryExamAdapter {
    fn institution(&self) -> &'static str {
        "국사편찬위원회"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let cert_parts = split_parts(&item.pass_num_trimmed(), '-', 2)?;
        let birth_raw = item
            .birth
            .as_deref()
            .ok_or_else(|| VeridocError::MissingField("birth".to_string()))?;
        let birth = normalize_birth(birth_raw)?;

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;

        session.fill_field("#kr_name", item.name.trim()).await?;
        session.fill_field("#certi_front", &cert_parts[0]).await?;
        session.fill_field("#certi_back", &cert_parts[1]).await?;
        session.fill_field("#birth", &birth).await?;

        session.click("#btnConfirm").await?;
        session.settle(ctx.budget.outcome_wait()).await;

        let fields: HashMap<String, String> = serde_json::from_value(
            session
                .evaluate_script(
                    "(() => { \
                       const tbody = document.querySelector('tbody'); \
                       if (!tbody) return {}; \
                       const data = {}; \
                       for (const row of tbody.querySelectorAll('tr')) { \
                         const ths = Array.from(row.querySelectorAll('th')); \
                         const tds = Array.from(row.querySelectorAll('td')); \
                         ths.forEach((th, i) => { \
                           const key = th.textContent.trim(); \
                           const value = tds[i]?.textContent.trim(); \
                           if (key && value) data[key] = value; \
                         }); \
                       } \
                       return data; \
                     })()",
                )
                .await?,
        )
        .unwrap_or_default();

        match classify_exam_table(&fields) {
            Some((grade_label, round)) => {
                let image = capture_page(session, false).await?;
                info!("{}: confirmed ({grade_label}, 회차 {round})", item.name);
                Ok(Outcome::Confirmed {
                    subs: Some(grade_label),
                    date: Some(round),
                    evidence: Evidence::new(
                        credential_evidence_path(self.institution(), item),
                        image,
                    ),
                })
            }
            None => {
                info!("{}: no passing record", item.name);
                Ok(Outcome::NotFound)
            }
        }
    }
}

/// A passing table yields the exam-plus-grade label and the exam round.
fn classify_exam_table(fields: &HashMap<String, String>) -> Option<(String, String)> {
    if fields.get("합격여부").map(String::as_str) != Some("합격") {
        return None;
    }
    let grade = fields.get("등급").cloned().unwrap_or_default();
    let round = fields.get("회차").cloned().unwrap_or_default();
    Some((format!("한국사능력검정시험{grade}"), round))
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
    fn test_passing_table_confirms() {
        let fields = table(&[
            ("회차", "62"),
            ("성명", "홍길동"),
            ("등급", "1급"),
            ("합격여부", "합격"),
        ]);
        assert_eq!(
            classify_exam_table(&fields),
            Some(("한국사능력검정시험1급".to_string(), "62".to_string()))
        );
    }

    #[test]
    fn test_failing_or_empty_table_is_negative() {
        assert_eq!(classify_exam_table(&HashMap::new()), None);
        let fields = table(&[("합격여부", "불합격"), ("등급", "3급")]);
        assert_eq!(classify_exam_table(&fields), None);
    }
}
