//! Core type definitions for credential verification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One person/document verification request, mutated in place as it moves
/// through dispatch, adapter execution, and evidence capture.
///
/// Result fields start absent and are written exactly once by the adapter
/// selected for the item. `result` is always set by the time the item leaves
/// the pipeline, even on internal failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    // Identity
    pub name: String,
    #[serde(default)]
    pub registration_number: String,
    /// Birth date shorthand (yyMMdd or yyyyMMdd); required by some portals
    #[serde(default)]
    pub birth: Option<String>,
    #[serde(default)]
    pub certificate_name: String,

    // Routing
    pub institution: String,
    /// Document/credential identifier; format varies by institution
    #[serde(default)]
    pub pass_num: Option<String>,
    /// Issuance date, used only by the national-pension portal
    #[serde(default)]
    pub issued_date: Option<String>,
    /// Auxiliary verification code, used only by the national-pension portal
    #[serde(default)]
    pub extra_num: Option<String>,

    // Result
    #[serde(default)]
    pub result: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_path: Option<String>,
    /// Raw PNG bytes; handed to the archival collaborator, never serialized
    #[serde(skip)]
    pub evidence_image: Option<Vec<u8>>,
}

impl WorkItem {
    /// Minimal constructor for tests and dry-run tooling.
    pub fn new(name: impl Into<String>, institution: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration_number: String::new(),
            birth: None,
            certificate_name: String::new(),
            institution: institution.into(),
            pass_num: None,
            issued_date: None,
            extra_num: None,
            result: 0,
            subs: None,
            date: None,
            error: None,
            evidence_path: None,
            evidence_image: None,
        }
    }

    /// Trimmed pass number, or empty string when absent.
    pub fn pass_num_trimmed(&self) -> String {
        self.pass_num.as_deref().unwrap_or("").trim().to_string()
    }

    /// Mark the item failed with a human-readable reason, clearing any
    /// partial evidence state.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.result = 0;
        self.error = Some(reason.into());
        self.evidence_path = None;
        self.evidence_image = None;
    }

    /// Projection handed to the tabular summary collaborator.
    pub fn summary_row(&self) -> SummaryRow {
        SummaryRow {
            name: self.name.clone(),
            registration_number: self.registration_number.clone(),
            certificate_name: self.certificate_name.clone(),
            institution: self.institution.clone(),
            result: self.result,
            date: self.date.clone().unwrap_or_default(),
            subs: self.subs.clone().unwrap_or_default(),
            error: self.error.clone().unwrap_or_default(),
        }
    }
}

/// Flat per-item projection for the results table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub name: String,
    pub registration_number: String,
    pub certificate_name: String,
    pub institution: String,
    pub result: u8,
    pub date: String,
    pub subs: String,
    pub error: String,
}

/// Captured proof of a confirmed outcome. Path and image travel together by
/// construction, which keeps the both-or-neither invariant out of adapter code.
#[derive(Debug, Clone)]
pub struct Evidence {
    /// Archive-relative path, deterministic per item
    pub archive_path: String,
    /// PNG payload
    pub image: Vec<u8>,
}

impl Evidence {
    pub fn new(archive_path: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            archive_path: archive_path.into(),
            image,
        }
    }
}

/// Tri-state classification of post-submission portal state.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Portal confirmed the document; metadata and evidence attached
    Confirmed {
        subs: Option<String>,
        date: Option<String>,
        evidence: Evidence,
    },
    /// Portal explicitly reported no matching record; not an error
    NotFound,
    /// Response shape matched no known positive or negative pattern
    Indeterminate(String),
}

/// Apply a classified outcome to the item. The single writer of result fields.
pub fn apply_outcome(item: &mut WorkItem, outcome: Outcome) {
    match outcome {
        Outcome::Confirmed {
            subs,
            date,
            evidence,
        } => {
            item.result = 1;
            item.subs = subs;
            item.date = date;
            item.error = None;
            item.evidence_path = Some(evidence.archive_path);
            item.evidence_image = Some(evidence.image);
        }
        Outcome::NotFound => {
            item.result = 0;
            item.error = None;
            item.evidence_path = None;
            item.evidence_image = None;
        }
        Outcome::Indeterminate(reason) => {
            item.mark_failed(reason);
        }
    }
}

/// End-of-batch summary handed to the telemetry collaborator. Returned by
/// value from the batch boundary so per-item verification stays free of
/// process-wide mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub user_label: String,
    pub item_count: usize,
    pub per_institution: HashMap<String, usize>,
    pub had_errors: bool,
}

impl BatchSummary {
    pub fn from_items(user_label: impl Into<String>, items: &[WorkItem]) -> Self {
        let mut per_institution: HashMap<String, usize> = HashMap::new();
        for item in items {
            *per_institution
                .entry(item.institution.trim().to_string())
                .or_insert(0) += 1;
        }
        Self {
            batch_id: Uuid::new_v4(),
            finished_at: Utc::now(),
            user_label: user_label.into(),
            item_count: items.len(),
            per_institution,
            had_errors: items.iter().any(|i| i.error.is_some()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed(evidence: Evidence) -> Outcome {
        Outcome::Confirmed {
            subs: Some("정보처리기사".to_string()),
            date: Some("2023-05-01".to_string()),
            evidence,
        }
    }

    #[test]
    fn test_confirmed_sets_evidence_pair() {
        let mut item = WorkItem::new("홍길동", "대한상공회의소");
        apply_outcome(
            &mut item,
            confirmed(Evidence::new("대한상공회의소/1_x.png", vec![1, 2, 3])),
        );
        assert_eq!(item.result, 1);
        assert!(item.error.is_none());
        assert!(item.evidence_path.is_some());
        assert!(item.evidence_image.is_some());
    }

    #[test]
    fn test_not_found_is_clean_negative() {
        let mut item = WorkItem::new("홍길동", "대한상공회의소");
        apply_outcome(&mut item, Outcome::NotFound);
        assert_eq!(item.result, 0);
        assert!(item.error.is_none());
        assert!(item.evidence_path.is_none());
        assert!(item.evidence_image.is_none());
    }

    #[test]
    fn test_indeterminate_carries_diagnostic() {
        let mut item = WorkItem::new("홍길동", "대한상공회의소");
        apply_outcome(&mut item, Outcome::Indeterminate("selector not found".into()));
        assert_eq!(item.result, 0);
        assert_eq!(item.error.as_deref(), Some("selector not found"));
        assert!(item.evidence_path.is_none());
    }

    #[test]
    fn test_mark_failed_clears_partial_evidence() {
        let mut item = WorkItem::new("홍길동", "opic");
        item.evidence_path = Some("x.png".into());
        item.evidence_image = Some(vec![0]);
        item.mark_failed("navigation timeout");
        assert_eq!(item.result, 0);
        assert!(item.evidence_path.is_none());
        assert!(item.evidence_image.is_none());
    }

    #[test]
    fn test_batch_summary_tallies_institutions() {
        let items = vec![
            WorkItem::new("a", "한국세무사회"),
            WorkItem::new("b", "한국세무사회"),
            WorkItem::new("c", "opic"),
        ];
        let summary = BatchSummary::from_items("operator", &items);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.per_institution.get("한국세무사회"), Some(&2));
        assert_eq!(summary.per_institution.get("opic"), Some(&1));
        assert!(!summary.had_errors);
    }

    #[test]
    fn test_batch_summary_flags_errors() {
        let mut bad = WorkItem::new("a", "화성협회");
        bad.mark_failed("Unknown institution: 화성협회");
        let summary = BatchSummary::from_items("operator", &[bad]);
        assert!(summary.had_errors);
    }

    #[test]
    fn test_work_item_json_round_trip() {
        let json = r#"{
            "name": "홍길동",
            "registrationNumber": "20240001",
            "certificateName": "전산세무 2급",
            "institution": "한국세무사회",
            "passNum": "12345678901"
        }"#;
        let item: WorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.name, "홍길동");
        assert_eq!(item.pass_num.as_deref(), Some("12345678901"));
        assert_eq!(item.result, 0);
    }
}
