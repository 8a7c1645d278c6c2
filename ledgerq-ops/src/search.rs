//! Read-only search: fetch a window, filter, sort newest first, shape output.

use std::cmp::Ordering;

use ledgerq_core::{Condition, OutputControl, Record, format_records, matches_all};
use ledgerq_fetch::{DateWindow, FetchOrchestrator, PageFetcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub window: DateWindow,
    /// `None` matches every fetched record
    pub criteria: Option<Condition>,
    pub output: OutputControl,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub pages_retrieved: usize,
    pub total_fetched: usize,
    pub matched_count: usize,
    pub output_count: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub records: Vec<Value>,
    pub count: usize,
    pub truncated: bool,
    pub truncated_count: usize,
    pub success: bool,
    pub message: String,
    pub meta: SearchMeta,
}

impl SearchResponse {
    /// A request that never reached the remote.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Newest date first; ties by descending id.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| match b.date_key().cmp(a.date_key()) {
        Ordering::Equal => b.id.cmp(&a.id),
        other => other,
    });
}

pub async fn search<F: PageFetcher + ?Sized>(
    request: &SearchRequest,
    fetcher: &F,
    orchestrator: &FetchOrchestrator,
) -> SearchResponse {
    let fetched = orchestrator.fetch_window(&request.window, fetcher).await;
    let total_fetched = fetched.records.len();

    let mut matched: Vec<Record> = match &request.criteria {
        Some(criteria) => matches_all(&fetched.records, criteria)
            .into_iter()
            .cloned()
            .collect(),
        None => fetched.records,
    };
    sort_newest_first(&mut matched);

    let formatted = format_records(&matched, &request.output);

    let message = match &fetched.error {
        Some(err) => err.clone(),
        None => {
            let mut msg = format!(
                "Found {} matching records ({} returned)",
                matched.len(),
                formatted.count
            );
            if fetched.has_more {
                msg.push_str("; fetch stopped at a safety limit, more records may exist");
            }
            msg
        }
    };

    info!(
        window = %request.window,
        fetched = total_fetched,
        matched = matched.len(),
        returned = formatted.count,
        "search finished"
    );

    SearchResponse {
        count: formatted.count,
        truncated: formatted.truncated,
        truncated_count: formatted.truncated_count,
        success: fetched.error.is_none(),
        message,
        meta: SearchMeta {
            pages_retrieved: fetched.pages_used,
            total_fetched,
            matched_count: matched.len(),
            output_count: formatted.count,
            has_more: fetched.has_more,
        },
        records: formatted.records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerq_core::Kind;

    #[test]
    fn test_sort_newest_first_then_id() {
        let mut records = vec![
            Record::new(1, Kind::Outflow, "2024-01-15", 1.0),
            Record::new(3, Kind::Outflow, "2024-01-16", 1.0),
            Record::new(2, Kind::Outflow, "2024-01-15", 1.0),
        ];
        sort_newest_first(&mut records);
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
