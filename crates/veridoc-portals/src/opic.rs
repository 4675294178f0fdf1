//! OPIc 어학 인증서 (opic.or.kr)
//!
//! The certificate number spans five input boxes. A bad number surfaces as a
//! layer popup; a good one renders a result row with grade and issue date
//! in fixed cell positions.

use crate::adapter::{named_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use tracing::info;
use veridoc_browser::capture_page;
use veridoc_core::normalize::split_parts;
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str = "https://www.opic.or.kr/opics/servlet/controller.opic.site.certi.CertiServlet?p_process=select-certicontrast";

const FAILURE_POPUP: &str = "div.layerpopInbox .ltxt";
const FAILURE_DISMISS: &str = "div.layerpopFoot .btn.secondary.lg";

pub struct OpicAdapter;

#[async_trait]
impl SiteAdapter for OpicAdapter {
    fn institution(&self) -> &'static str {
        "OPIc"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let cert_parts = split_parts(&item.pass_num_trimmed(), '-', 5)?;

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;

        // Five certificate boxes, cleared together then typed individually
        session
            .evaluate_script("document.querySelectorAll('.inp').forEach(el => el.value = '')")
            .await?;
        let inputs = session
            .tab()
            .find_elements(".inp")
            .map_err(|_| VeridocError::Browser("Certificate inputs not found: .inp".to_string()))?;
        if inputs.len() != 5 {
            return Err(VeridocError::Browser(format!(
                "Expected 5 certificate inputs, found {}",
                inputs.len()
            )));
        }
        for (input, part) in inputs.iter().zip(&cert_parts) {
            input.type_into(part).map_err(|e| {
                VeridocError::Browser(format!("Failed to type certificate part: {e}"))
            })?;
        }

        session.click("button.btn.md.secondary02").await?;
        session.settle(ctx.budget.outcome_wait()).await;

        let popup_text = session.text_content(FAILURE_POPUP).await?;
        let cells: Vec<String> = serde_json::from_value(
            session
                .evaluate_script(
                    "Array.from(document.querySelectorAll('tr td span.tdcell'))\
                        .map(el => el.textContent.trim())",
                )
                .await?,
        )
        .unwrap_or_default();

        match classify_opic_result(&popup_text, &cells) {
            OpicResult::Confirmed { grade, issued } => {
                let image = capture_page(session, true).await?;
                info!("{}: confirmed ({grade}, {issued})", item.name);
                Ok(Outcome::Confirmed {
                    subs: Some(grade),
                    date: Some(issued),
                    evidence: Evidence::new(
                        named_evidence_path("자격증/OPIc", item),
                        image,
                    ),
                })
            }
            OpicResult::BadNumber(message) => {
                info!("{}: {}", item.name, message);
                // Close the layer so teardown screenshots stay clean
                let _ = session.click(FAILURE_DISMISS).await;
                Ok(Outcome::NotFound)
            }
            OpicResult::Unrecognized => Ok(Outcome::Indeterminate(
                "결과를 찾을 수 없습니다".to_string(),
            )),
        }
    }
}

#[derive(Debug, PartialEq)]
enum OpicResult {
    Confirmed { grade: String, issued: String },
    BadNumber(String),
    Unrecognized,
}

/// Result row cells are positional: index 5 is the grade, index 6 the issue
/// date. The failure layer wins over any stale row content.
fn classify_opic_result(popup_text: &str, cells: &[String]) -> OpicResult {
    if popup_text.contains("인증서 번호를 다시 확인해 주세요") {
        return OpicResult::BadNumber(popup_text.trim().to_string());
    }
    if cells.len() > 6 && !cells[5].is_empty() {
        return OpicResult::Confirmed {
            grade: cells[5].clone(),
            issued: cells[6].clone(),
        };
    }
    OpicResult::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_result_row_confirms() {
        let row = cells(&["홍길동", "OPIc", "English", "2023", "서울", "IH", "2023-04-12"]);
        assert_eq!(
            classify_opic_result("", &row),
            OpicResult::Confirmed {
                grade: "IH".to_string(),
                issued: "2023-04-12".to_string(),
            }
        );
    }

    #[test]
    fn test_failure_layer_is_negative() {
        let result = classify_opic_result("인증서 번호를 다시 확인해 주세요.", &[]);
        assert!(matches!(result, OpicResult::BadNumber(_)));
    }

    #[test]
    fn test_failure_layer_wins_over_stale_row() {
        let row = cells(&["a", "b", "c", "d", "e", "IH", "2023-04-12"]);
        let result = classify_opic_result("인증서 번호를 다시 확인해 주세요.", &row);
        assert!(matches!(result, OpicResult::BadNumber(_)));
    }

    #[test]
    fn test_empty_state_is_unrecognized() {
        assert_eq!(classify_opic_result("", &[]), OpicResult::Unrecognized);
    }
}
