mod common;

use common::{FakeLedger, january, no_delay, orchestrator};
use ledgerq_core::{Kind, Record};
use ledgerq_ops::LedgerTools;
use serde_json::json;

fn tools(ledger: &FakeLedger) -> LedgerTools<FakeLedger, FakeLedger> {
    LedgerTools::new(ledger.clone(), ledger.clone(), orchestrator(), no_delay())
}

#[tokio::test]
async fn id_only_sorted_newest_first() {
    let ledger = FakeLedger::new(vec![
        Record::new(2, Kind::Outflow, "2024-01-15", 1000.0),
        Record::new(1, Kind::Outflow, "2024-01-16", 2000.0),
    ]);
    let resp = tools(&ledger)
        .search_json(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "output": {"mode": "id_only"}
        }))
        .await;

    assert!(resp.success);
    assert_eq!(resp.records, vec![json!(1), json!(2)]);
    assert_eq!(resp.count, 2);
    assert!(!resp.truncated);
    assert_eq!(resp.meta.total_fetched, 2);
    assert_eq!(resp.meta.pages_retrieved, 1);
}

#[tokio::test]
async fn nested_criteria_filter() {
    let ledger = FakeLedger::new(january());
    let resp = tools(&ledger)
        .search_json(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "criteria": {
                "type": "logical",
                "operator": "AND",
                "conditions": [
                    {"type": "condition", "field": "kind", "operator": "equals", "value": "outflow"},
                    {
                        "type": "logical",
                        "operator": "OR",
                        "conditions": [
                            {"type": "condition", "field": "place", "operator": "startsWith", "value": "book"},
                            {"type": "condition", "field": "amount", "operator": "lessThan", "value": 5}
                        ]
                    }
                ]
            },
            "output": {"mode": "specified", "fields": ["id", "place"]}
        }))
        .await;

    assert!(resp.success, "{}", resp.message);
    assert_eq!(
        resp.records,
        vec![
            json!({"id": 3, "place": "Book Nook"}),
            json!({"id": 1, "place": "Cafe Luna"}),
        ]
    );
    assert_eq!(resp.meta.matched_count, 2);
    assert_eq!(resp.message, "Found 2 matching records (2 returned)");
}

#[tokio::test]
async fn output_limits_report_truncation() {
    let ledger = FakeLedger::new(january());
    let resp = tools(&ledger)
        .search_json(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "output": {"mode": "id_only", "maxRecords": 1}
        }))
        .await;

    assert_eq!(resp.records, vec![json!(4)]);
    assert!(resp.truncated);
    assert_eq!(resp.truncated_count, 3);
    assert_eq!(resp.meta.matched_count, 4);
    assert_eq!(resp.meta.output_count, 1);
}

#[tokio::test]
async fn fetch_error_is_reported_verbatim() {
    let ledger = FakeLedger::new(january()).failing_fetch("upstream 502: bad gateway");
    let resp = tools(&ledger)
        .search_json(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"}
        }))
        .await;

    assert!(!resp.success);
    assert_eq!(resp.message, "upstream 502: bad gateway");
    assert!(resp.records.is_empty());
    assert_eq!(ledger.page_calls(), 1);
}

#[tokio::test]
async fn inverted_window_is_empty_not_an_error() {
    let ledger = FakeLedger::new(january());
    let resp = tools(&ledger)
        .search_json(json!({
            "dateRange": {"start": "2024-02-01", "end": "2024-01-01"}
        }))
        .await;

    assert!(resp.success);
    assert_eq!(resp.count, 0);
    assert_eq!(ledger.page_calls(), 0);
}

#[tokio::test]
async fn bad_criteria_never_reach_the_remote() {
    let ledger = FakeLedger::new(january());
    let resp = tools(&ledger)
        .search_json(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "criteria": {"type": "condition", "field": "amount", "operator": "contains", "value": "1"}
        }))
        .await;

    assert!(!resp.success);
    assert!(resp.message.contains("contains"), "{}", resp.message);
    assert_eq!(ledger.page_calls(), 0);
}
