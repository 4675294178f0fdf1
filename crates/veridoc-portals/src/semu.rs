//! 한국세무사회 (Korea Association of Certified Public Tax Accountants)
//!
//! license.kacpta.or.kr signals a bad credential number through a native
//! alert, so the dialog watcher is armed before submission. Valid lookups
//! render a result table whose second row carries the match verdict.

use crate::adapter::{credential_evidence_path, AdapterContext, SiteAdapter};
use async_trait::async_trait;
use tracing::{debug, info};
use veridoc_browser::{capture_page, DialogWatcher};
use veridoc_core::{Evidence, Outcome, Result, VeridocError, WorkItem};

const VERIFY_URL: &str = "https://license.kacpta.or.kr/web/issue/license_auth.aspx";

/// Entry popups shown on some visits; closed best-effort before the form.
const POPUP_CLOSERS: &[&str] = &[
    r#".pop_wrap img[onclick="my_web_pop1_temp()"]"#,
    r#".pop_wrap1 img[onclick="my_web_pop2_temp()"]"#,
    r#"input[type='checkbox'][id='ckbox1']"#,
    r#"img[onclick="myjbpop1_temp()"]"#,
];

pub struct SemuAdapter;

#[async_trait]
impl SiteAdapter for SemuAdapter {
    fn institution(&self) -> &'static str {
        "한국세무사회"
    }

    async fn verify(&self, item: &WorkItem, ctx: &AdapterContext<'_>) -> Result<Outcome> {
        let name = item.name.trim();
        let pass_num = item.pass_num_trimmed();

        if name.is_empty() {
            return Err(VeridocError::MissingField("name".to_string()));
        }
        let digits = pass_num.chars().count();
        if !(10..=12).contains(&digits) {
            return Err(VeridocError::Format(format!(
                "유효하지 않은 번호: {pass_num} (10~12자리여야 함)"
            )));
        }

        let session = ctx.session;
        session.navigate(VERIFY_URL).await?;
        close_entry_popups(ctx).await;

        session.fill_field("input[name='sname']", name).await?;
        session.fill_field("input[name='snum']", &pass_num).await?;

        // The portal alerts on unknown numbers instead of rendering a row;
        // the watcher has to exist before the click, and it closes the
        // alert itself so the click can complete.
        let dialog = DialogWatcher::arm(session)?;
        session.click(r#"button[onclick="do_submit()"]"#).await?;
        session.settle(ctx.budget.outcome_wait()).await;

        if let Some(message) = dialog.message() {
            info!("{}: portal alert: {}", item.name, message);
            return Ok(Outcome::NotFound);
        }

        let cells: Vec<String> = serde_json::from_value(
            session
                .evaluate_script(
                    "(() => { \
                       const row = document.querySelector('tbody tr:nth-child(2)'); \
                       if (!row) return []; \
                       return Array.from(row.querySelectorAll('td')).map(td => td.textContent.trim()); \
                     })()",
                )
                .await?,
        )
        .unwrap_or_default();

        match judge_result_row(&cells) {
            RowJudgement::Match { subject, pass_date } => {
                let image = capture_page(session, true).await?;
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
            RowJudgement::Mismatch => {
                info!("{}: 자격번호 불일치", item.name);
                Ok(Outcome::NotFound)
            }
            RowJudgement::Unrecognized => Ok(Outcome::Indeterminate(
                "결과 행을 찾을 수 없습니다".to_string(),
            )),
        }
    }
}

async fn close_entry_popups(ctx: &AdapterContext<'_>) {
    for selector in POPUP_CLOSERS {
        if ctx.session.element_exists(selector).await {
            debug!("Closing entry popup: {}", selector);
            // Best effort; a popup that refuses to close fails later waits
            let _ = ctx.session.click(selector).await;
            ctx.session
                .settle(std::time::Duration::from_millis(500))
                .await;
        }
    }
}

/// Verdict of the result table's data row: columns are
/// [no, name, verdict, subject, pass date].
#[derive(Debug, PartialEq)]
enum RowJudgement {
    Match { subject: String, pass_date: String },
    Mismatch,
    Unrecognized,
}

fn judge_result_row(cells: &[String]) -> RowJudgement {
    if cells.len() < 5 {
        return RowJudgement::Unrecognized;
    }
    match cells[2].as_str() {
        "일치" => RowJudgement::Match {
            subject: cells[3].clone(),
            pass_date: cells[4].clone(),
        },
        "불일치" => RowJudgement::Mismatch,
        _ => RowJudgement::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matching_row_confirms() {
        let cells = row(&["1", "홍길동", "일치", "전산세무 2급", "2023-05-27"]);
        assert_eq!(
            judge_result_row(&cells),
            RowJudgement::Match {
                subject: "전산세무 2급".to_string(),
                pass_date: "2023-05-27".to_string(),
            }
        );
    }

    #[test]
    fn test_mismatch_row_is_clean_negative() {
        let cells = row(&["1", "홍길동", "불일치", "", ""]);
        assert_eq!(judge_result_row(&cells), RowJudgement::Mismatch);
    }

    #[test]
    fn test_missing_row_is_unrecognized() {
        assert_eq!(judge_result_row(&[]), RowJudgement::Unrecognized);
        let cells = row(&["1", "홍길동", "확인불가", "", ""]);
        assert_eq!(judge_result_row(&cells), RowJudgement::Unrecognized);
    }
}
