//! Bulk update and delete behind safety checks.
//!
//! Every request runs VALIDATE -> FETCH -> FILTER -> COUNT-CHECK and then
//! either previews (dry run) or applies writes one record at a time. The
//! target set is always recomputed from live data; a caller-held count is
//! only ever compared against it, never trusted.

use std::time::Duration;

use async_trait::async_trait;
use ledgerq_core::{Condition, Kind, Record, UpdateSpec, matches_all};
use ledgerq_fetch::{DateWindow, FetchOrchestrator, PageFetcher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(200);

/// Per-record writes against the remote ledger.
#[async_trait]
pub trait RecordMutator: Send + Sync {
    /// Replace the stored record with `record`.
    async fn update_record(&self, kind: Kind, id: i64, record: &Record) -> anyhow::Result<()>;

    async fn delete_record(&self, kind: Kind, id: i64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOptions {
    /// Pause between successive writes
    pub delay: Duration,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_WRITE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdateRequest {
    pub criteria: Condition,
    pub window: DateWindow,
    pub expected_count: usize,
    pub dry_run: bool,
    pub updates: UpdateSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkDeleteRequest {
    pub criteria: Condition,
    pub window: DateWindow,
    pub expected_count: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request shape is unsafe or malformed; nothing was fetched
    Validation,
    /// The page fetcher failed
    Transport,
    /// Live data disagrees with the caller's premise
    Consistency,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BulkError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no fields to update")]
    NoUpdates,
    #[error("expectedCount must be a positive integer")]
    InvalidExpectedCount,
    #[error(
        "updated fields must also appear in the criteria: {}; search on them first",
        .0.join(", ")
    )]
    UncoveredFields(Vec<String>),
    #[error("refusing to delete without criteria")]
    UnconditionalDelete,
    #[error("{0}")]
    Fetch(String),
    #[error("fetch stopped at a safety limit after {fetched} records; the target set is incomplete")]
    IncompleteFetch { fetched: usize },
    #[error("expected {expected} matching records but found {actual}; re-run the search and confirm the count")]
    CountMismatch { expected: usize, actual: usize },
}

impl BulkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BulkError::InvalidRequest(_)
            | BulkError::NoUpdates
            | BulkError::InvalidExpectedCount
            | BulkError::UncoveredFields(_)
            | BulkError::UnconditionalDelete => ErrorKind::Validation,
            BulkError::Fetch(_) => ErrorKind::Transport,
            BulkError::IncompleteFetch { .. } | BulkError::CountMismatch { .. } => {
                ErrorKind::Consistency
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub id: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStats {
    pub target_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub results: Vec<ItemResult>,
    pub stats: BulkStats,
}

impl BulkResponse {
    pub fn failed(err: &BulkError, dry_run: bool) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            error_kind: Some(err.kind()),
            results: Vec::new(),
            stats: BulkStats {
                dry_run,
                ..BulkStats::default()
            },
        }
    }

    fn nothing_matched(verb: &str, dry_run: bool) -> Self {
        Self {
            success: true,
            message: format!("No records matched the criteria; nothing to {verb}"),
            error_kind: None,
            results: Vec::new(),
            stats: BulkStats {
                dry_run,
                ..BulkStats::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Update,
    Delete,
}

impl Verb {
    fn present(&self) -> &'static str {
        match self {
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }

    fn past(&self) -> &'static str {
        match self {
            Verb::Update => "updated",
            Verb::Delete => "deleted",
        }
    }
}

pub async fn bulk_update<F, M>(
    request: &BulkUpdateRequest,
    fetcher: &F,
    mutator: &M,
    orchestrator: &FetchOrchestrator,
    options: &MutationOptions,
) -> BulkResponse
where
    F: PageFetcher + ?Sized,
    M: RecordMutator + ?Sized,
{
    match try_bulk_update(request, fetcher, mutator, orchestrator, options).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!(error = %err, "bulk update rejected");
            BulkResponse::failed(&err, request.dry_run)
        }
    }
}

pub async fn bulk_delete<F, M>(
    request: &BulkDeleteRequest,
    fetcher: &F,
    mutator: &M,
    orchestrator: &FetchOrchestrator,
    options: &MutationOptions,
) -> BulkResponse
where
    F: PageFetcher + ?Sized,
    M: RecordMutator + ?Sized,
{
    match try_bulk_delete(request, fetcher, mutator, orchestrator, options).await {
        Ok(resp) => resp,
        Err(err) => {
            warn!(error = %err, "bulk delete rejected");
            BulkResponse::failed(&err, request.dry_run)
        }
    }
}

/// Updates may only touch fields the criteria already test.
pub fn validate_update(request: &BulkUpdateRequest) -> Result<(), BulkError> {
    if request.updates.is_empty() {
        return Err(BulkError::NoUpdates);
    }
    if request.expected_count == 0 {
        return Err(BulkError::InvalidExpectedCount);
    }
    let uncovered = request.updates.uncovered_fields(&request.criteria);
    if !uncovered.is_empty() {
        return Err(BulkError::UncoveredFields(uncovered));
    }
    Ok(())
}

pub fn validate_delete(request: &BulkDeleteRequest) -> Result<(), BulkError> {
    if request.criteria.is_unconditional() {
        return Err(BulkError::UnconditionalDelete);
    }
    if request.expected_count == 0 {
        return Err(BulkError::InvalidExpectedCount);
    }
    Ok(())
}

async fn try_bulk_update<F, M>(
    request: &BulkUpdateRequest,
    fetcher: &F,
    mutator: &M,
    orchestrator: &FetchOrchestrator,
    options: &MutationOptions,
) -> Result<BulkResponse, BulkError>
where
    F: PageFetcher + ?Sized,
    M: RecordMutator + ?Sized,
{
    validate_update(request)?;

    let targets = collect_targets(
        &request.criteria,
        &request.window,
        request.expected_count,
        fetcher,
        orchestrator,
    )
    .await?;
    if targets.is_empty() {
        return Ok(BulkResponse::nothing_matched(Verb::Update.present(), request.dry_run));
    }

    if request.dry_run {
        let results = targets
            .iter()
            .map(|r| {
                let (before, after) = request.updates.preview(r);
                ItemResult {
                    id: r.id,
                    success: true,
                    before: Some(before),
                    after: Some(after),
                    ..ItemResult::default()
                }
            })
            .collect();
        return Ok(dry_run_response(Verb::Update, results));
    }

    let mut results = Vec::with_capacity(targets.len());
    for (i, target) in targets.iter().enumerate() {
        pause(i, options).await;
        let proposed = request.updates.apply(target);
        let outcome = mutator.update_record(target.kind, target.id, &proposed).await;
        results.push(item_outcome(target.id, outcome));
    }
    Ok(applied_response(Verb::Update, results))
}

async fn try_bulk_delete<F, M>(
    request: &BulkDeleteRequest,
    fetcher: &F,
    mutator: &M,
    orchestrator: &FetchOrchestrator,
    options: &MutationOptions,
) -> Result<BulkResponse, BulkError>
where
    F: PageFetcher + ?Sized,
    M: RecordMutator + ?Sized,
{
    validate_delete(request)?;

    let targets = collect_targets(
        &request.criteria,
        &request.window,
        request.expected_count,
        fetcher,
        orchestrator,
    )
    .await?;
    if targets.is_empty() {
        return Ok(BulkResponse::nothing_matched(Verb::Delete.present(), request.dry_run));
    }

    if request.dry_run {
        let results = targets
            .iter()
            .map(|r| ItemResult {
                id: r.id,
                success: true,
                summary: Some(r.summary()),
                ..ItemResult::default()
            })
            .collect();
        return Ok(dry_run_response(Verb::Delete, results));
    }

    let mut results = Vec::with_capacity(targets.len());
    for (i, target) in targets.iter().enumerate() {
        pause(i, options).await;
        let outcome = mutator.delete_record(target.kind, target.id).await;
        results.push(item_outcome(target.id, outcome));
    }
    Ok(applied_response(Verb::Delete, results))
}

/// FETCH + FILTER + COUNT-CHECK. An empty target set skips the count check.
async fn collect_targets<F: PageFetcher + ?Sized>(
    criteria: &Condition,
    window: &DateWindow,
    expected: usize,
    fetcher: &F,
    orchestrator: &FetchOrchestrator,
) -> Result<Vec<Record>, BulkError> {
    let fetched = orchestrator.fetch_window(window, fetcher).await;
    if let Some(err) = fetched.error {
        return Err(BulkError::Fetch(err));
    }
    if fetched.has_more {
        return Err(BulkError::IncompleteFetch {
            fetched: fetched.records.len(),
        });
    }

    let targets: Vec<Record> = matches_all(&fetched.records, criteria)
        .into_iter()
        .cloned()
        .collect();
    debug!(window = %window, targets = targets.len(), expected, "targets computed");

    if !targets.is_empty() && targets.len() != expected {
        return Err(BulkError::CountMismatch {
            expected,
            actual: targets.len(),
        });
    }
    Ok(targets)
}

async fn pause(index: usize, options: &MutationOptions) {
    if index > 0 && !options.delay.is_zero() {
        tokio::time::sleep(options.delay).await;
    }
}

fn item_outcome(id: i64, outcome: anyhow::Result<()>) -> ItemResult {
    match outcome {
        Ok(()) => ItemResult {
            id,
            success: true,
            ..ItemResult::default()
        },
        Err(e) => {
            warn!(id, error = %e, "write failed");
            ItemResult {
                id,
                success: false,
                error: Some(format!("{e:#}")),
                ..ItemResult::default()
            }
        }
    }
}

fn dry_run_response(verb: Verb, results: Vec<ItemResult>) -> BulkResponse {
    let n = results.len();
    BulkResponse {
        success: true,
        message: format!("Dry run: {n} records would be {}. No changes were made.", verb.past()),
        error_kind: None,
        results,
        stats: BulkStats {
            target_count: n,
            success_count: 0,
            failure_count: 0,
            dry_run: true,
        },
    }
}

fn applied_response(verb: Verb, results: Vec<ItemResult>) -> BulkResponse {
    let target_count = results.len();
    let success_count = results.iter().filter(|r| r.success).count();
    let failure_count = target_count - success_count;

    let message = if failure_count == 0 {
        format!("{} {target_count} records", capitalize(verb.past()))
    } else {
        format!(
            "{} {success_count} of {target_count} records; {failure_count} failed",
            capitalize(verb.past())
        )
    };
    info!(target_count, success_count, failure_count, "bulk {} finished", verb.present());

    BulkResponse {
        success: failure_count == 0,
        message,
        error_kind: None,
        results,
        stats: BulkStats {
            target_count,
            success_count,
            failure_count,
            dry_run: false,
        },
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
