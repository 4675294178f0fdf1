//! Batch orchestration
//!
//! Items are independent: each one owns its own browser session and its
//! outcome depends only on its own fields plus live portal state. The runner
//! therefore needs no cross-item ordering: it preserves input order in the
//! returned vector and isolates every per-item failure.
//!
//! Concurrency is a bounded worker-group pattern: items run in small fixed
//! groups so neither the local browser host nor the portals' anti-abuse
//! thresholds are overwhelmed.

use futures::future::join_all;
use tracing::{error, info};
use veridoc_core::{BatchSummary, Result, VeridocConfig, WorkItem};

/// Outcome of one batch run: the mutated items, in input order, plus the
/// telemetry summary. Telemetry emission is the caller's concern and must
/// never affect the items.
#[derive(Debug)]
pub struct BatchReport {
    pub items: Vec<WorkItem>,
    pub summary: BatchSummary,
}

/// Verify a batch of work items.
///
/// Every item comes back with `result` set; a routing failure, a format
/// error, or a portal problem fails that item alone. The only error this
/// returns is resource exhaustion, the host failing to launch a browser at
/// all, and that aborts the whole batch.
pub async fn verify_batch(
    mut items: Vec<WorkItem>,
    config: &VeridocConfig,
    user_label: &str,
) -> Result<BatchReport> {
    let group_size = config.worker_group_size();
    info!(
        "Verifying batch of {} items (groups of {})",
        items.len(),
        group_size
    );

    for group in items.chunks_mut(group_size) {
        let results = join_all(
            group
                .iter_mut()
                .map(|item| veridoc_portals::execute(item, config)),
        )
        .await;

        // Launch failures mean the host is out of browser capacity; stop
        // rather than burn through the rest of the batch
        if let Some(Err(e)) = results.into_iter().find(|r| r.is_err()) {
            error!("Batch aborted: {}", e);
            return Err(e);
        }
    }

    let summary = BatchSummary::from_items(user_label, &items);
    info!(
        "Batch {} finished: {} items, errors: {}",
        summary.batch_id, summary.item_count, summary.had_errors
    );

    Ok(BatchReport { items, summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Routing failures happen before any browser launch, so unknown
    // institutions exercise the batch boundary without Chrome.
    fn unroutable(name: &str) -> WorkItem {
        WorkItem::new(name, "화성협회")
    }

    #[tokio::test]
    async fn test_bad_item_does_not_abort_batch() {
        let items = vec![unroutable("a"), unroutable("b"), unroutable("c"), unroutable("d")];
        let config = VeridocConfig::default();

        let report = verify_batch(items, &config, "operator").await.unwrap();

        assert_eq!(report.items.len(), 4);
        for item in &report.items {
            assert_eq!(item.result, 0);
            assert!(item.error.as_deref().unwrap().contains("화성협회"));
        }
        assert!(report.summary.had_errors);
        assert_eq!(report.summary.item_count, 4);
    }

    #[tokio::test]
    async fn test_input_order_preserved() {
        let items = vec![unroutable("first"), unroutable("second"), unroutable("third")];
        let config = VeridocConfig::default();

        let report = verify_batch(items, &config, "operator").await.unwrap();

        let names: Vec<&str> = report.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_summary_counts_institutions() {
        let mut other = unroutable("x");
        other.institution = "금성협회".to_string();
        let items = vec![unroutable("a"), unroutable("b"), other];
        let config = VeridocConfig::default();

        let report = verify_batch(items, &config, "operator").await.unwrap();
        assert_eq!(report.summary.per_institution.get("화성협회"), Some(&2));
        assert_eq!(report.summary.per_institution.get("금성협회"), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let config = VeridocConfig::default();
        let report = verify_batch(Vec::new(), &config, "operator").await.unwrap();
        assert!(report.items.is_empty());
        assert_eq!(report.summary.item_count, 0);
        assert!(!report.summary.had_errors);
    }
}
