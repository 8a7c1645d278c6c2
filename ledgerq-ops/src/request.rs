//! Caller JSON shapes for search, bulk update and bulk delete.

use ledgerq_core::{Condition, ConditionError, ConditionSpec, OutputControl, UpdateError, UpdateSpec};
use ledgerq_fetch::{DateWindow, WindowError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::bulk::{BulkDeleteRequest, BulkError, BulkUpdateRequest};
use crate::search::SearchRequest;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("invalid criteria: {0}")]
    Condition(#[from] ConditionError),
    #[error("invalid updates: {0}")]
    Update(#[from] UpdateError),
    #[error("expectedCount must be a positive integer, got {0}")]
    ExpectedCount(i64),
    #[error("refusing to delete without criteria")]
    UnconditionalDelete,
}

impl From<RequestError> for BulkError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::ExpectedCount(_) => BulkError::InvalidExpectedCount,
            RequestError::UnconditionalDelete => BulkError::UnconditionalDelete,
            other => BulkError::InvalidRequest(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl TryFrom<&DateRange> for DateWindow {
    type Error = WindowError;

    fn try_from(range: &DateRange) -> Result<Self, Self::Error> {
        DateWindow::parse(&range.start, &range.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub date_range: DateRange,
    #[serde(default)]
    pub criteria: Option<ConditionSpec>,
    #[serde(default)]
    pub output: OutputControl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateParams {
    pub date_range: DateRange,
    pub criteria: ConditionSpec,
    pub updates: Value,
    pub expected_count: i64,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteParams {
    pub date_range: DateRange,
    /// Missing criteria parse as an empty AND and are then refused.
    #[serde(default)]
    pub criteria: Option<ConditionSpec>,
    pub expected_count: i64,
    #[serde(default)]
    pub dry_run: bool,
}

fn expected_count(n: i64) -> Result<usize, RequestError> {
    usize::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or(RequestError::ExpectedCount(n))
}

impl TryFrom<SearchParams> for SearchRequest {
    type Error = RequestError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        Ok(SearchRequest {
            window: DateWindow::try_from(&params.date_range)?,
            criteria: params.criteria.map(Condition::try_from).transpose()?,
            output: params.output,
        })
    }
}

impl TryFrom<BulkUpdateParams> for BulkUpdateRequest {
    type Error = RequestError;

    fn try_from(params: BulkUpdateParams) -> Result<Self, Self::Error> {
        Ok(BulkUpdateRequest {
            window: DateWindow::try_from(&params.date_range)?,
            criteria: Condition::try_from(params.criteria)?,
            updates: UpdateSpec::from_json(&params.updates)?,
            expected_count: expected_count(params.expected_count)?,
            dry_run: params.dry_run,
        })
    }
}

impl TryFrom<BulkDeleteParams> for BulkDeleteRequest {
    type Error = RequestError;

    fn try_from(params: BulkDeleteParams) -> Result<Self, Self::Error> {
        let criteria = delete_criteria(params.criteria)?;
        Ok(BulkDeleteRequest {
            window: DateWindow::try_from(&params.date_range)?,
            criteria,
            expected_count: expected_count(params.expected_count)?,
            dry_run: params.dry_run,
        })
    }
}

pub fn parse_search(value: Value) -> Result<SearchRequest, RequestError> {
    let params: SearchParams = serde_json::from_value(value)?;
    SearchRequest::try_from(params)
}

pub fn parse_bulk_update(value: Value) -> Result<BulkUpdateRequest, RequestError> {
    let params: BulkUpdateParams = serde_json::from_value(value)?;
    BulkUpdateRequest::try_from(params)
}

/// Missing criteria count as an empty AND. Anything that matches every
/// record is refused before the rest of the request is looked at.
fn delete_criteria(spec: Option<ConditionSpec>) -> Result<Condition, RequestError> {
    let criteria = match spec {
        Some(spec) => Condition::try_from(spec)?,
        None => Condition::and(Vec::new()),
    };
    if criteria.is_unconditional() {
        return Err(RequestError::UnconditionalDelete);
    }
    Ok(criteria)
}

pub fn parse_bulk_delete(value: Value) -> Result<BulkDeleteRequest, RequestError> {
    let spec = match value.get("criteria").filter(|v| !v.is_null()) {
        Some(raw) => Some(serde_json::from_value::<ConditionSpec>(raw.clone())?),
        None => None,
    };
    delete_criteria(spec)?;
    let params: BulkDeleteParams = serde_json::from_value(value)?;
    BulkDeleteRequest::try_from(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerq_core::{Field, OutputMode};
    use serde_json::json;

    #[test]
    fn search_with_id_only_output() {
        let req = parse_search(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "criteria": {"type": "condition", "field": "place", "operator": "contains", "value": "Cafe"},
            "output": {"mode": "id_only"}
        }))
        .unwrap();
        assert_eq!(req.output.mode, OutputMode::IdOnly);
        assert!(req.criteria.unwrap().fields().contains(&Field::Place));
    }

    #[test]
    fn search_without_criteria() {
        let req = parse_search(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"}
        }))
        .unwrap();
        assert!(req.criteria.is_none());
        assert_eq!(req.output.mode, OutputMode::Full);
    }

    #[test]
    fn bad_date_is_rejected() {
        let err = parse_search(json!({
            "dateRange": {"start": "2024-1-01x", "end": "2024-01-31"}
        }))
        .unwrap_err();
        assert!(matches!(err, RequestError::Window(_)));
    }

    #[test]
    fn non_positive_expected_count() {
        for n in [0, -3] {
            let err = parse_bulk_delete(json!({
                "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
                "criteria": {"type": "condition", "field": "kind", "operator": "equals", "value": "outflow"},
                "expectedCount": n
            }))
            .unwrap_err();
            assert!(matches!(err, RequestError::ExpectedCount(_)));
            assert_eq!(BulkError::from(err), BulkError::InvalidExpectedCount);
        }
    }

    #[test]
    fn delete_without_criteria_is_refused() {
        let err = parse_bulk_delete(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "expectedCount": 2
        }))
        .unwrap_err();
        assert!(matches!(err, RequestError::UnconditionalDelete));
    }

    #[test]
    fn unconditional_delete_wins_over_other_errors() {
        for (range, count) in [
            (json!({"start": "bad", "end": "2024-01-31"}), json!(3)),
            (json!({"start": "2024-01-01", "end": "2024-01-31"}), json!(0)),
            (json!(null), json!(null)),
        ] {
            let err = parse_bulk_delete(json!({
                "dateRange": range,
                "criteria": {"type": "logical", "operator": "AND", "conditions": []},
                "expectedCount": count
            }))
            .unwrap_err();
            assert_eq!(BulkError::from(err), BulkError::UnconditionalDelete);
        }
    }

    #[test]
    fn update_parses_changes() {
        let req = parse_bulk_update(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "criteria": {"type": "condition", "field": "place", "operator": "equals", "value": "A"},
            "updates": {"place": "B"},
            "expectedCount": 3,
            "dryRun": true
        }))
        .unwrap();
        assert_eq!(req.expected_count, 3);
        assert!(req.dry_run);
        assert!(!req.updates.is_empty());
    }

    #[test]
    fn update_requires_criteria() {
        let err = parse_bulk_update(json!({
            "dateRange": {"start": "2024-01-01", "end": "2024-01-31"},
            "updates": {"place": "B"},
            "expectedCount": 3
        }))
        .unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }
}
