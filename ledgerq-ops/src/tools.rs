use serde_json::Value;
use tracing::warn;

use ledgerq_fetch::{FetchOrchestrator, PageFetcher};

use crate::bulk::{BulkError, BulkResponse, MutationOptions, RecordMutator, bulk_delete, bulk_update};
use crate::request::{parse_bulk_delete, parse_bulk_update, parse_search};
use crate::search::{SearchResponse, search};

/// The three ledger tools bound to one remote.
///
/// Each entry point takes caller JSON and always returns a structured
/// response; parse failures come back as `success: false`.
pub struct LedgerTools<F, M> {
    fetcher: F,
    mutator: M,
    orchestrator: FetchOrchestrator,
    mutation: MutationOptions,
}

impl<F, M> LedgerTools<F, M>
where
    F: PageFetcher,
    M: RecordMutator,
{
    pub fn new(
        fetcher: F,
        mutator: M,
        orchestrator: FetchOrchestrator,
        mutation: MutationOptions,
    ) -> Self {
        Self {
            fetcher,
            mutator,
            orchestrator,
            mutation,
        }
    }

    pub async fn search_json(&self, params: Value) -> SearchResponse {
        match parse_search(params) {
            Ok(request) => search(&request, &self.fetcher, &self.orchestrator).await,
            Err(e) => {
                warn!(error = %e, "search request rejected");
                SearchResponse::invalid(e.to_string())
            }
        }
    }

    pub async fn bulk_update_json(&self, params: Value) -> BulkResponse {
        let dry_run = dry_run_flag(&params);
        match parse_bulk_update(params) {
            Ok(request) => {
                bulk_update(
                    &request,
                    &self.fetcher,
                    &self.mutator,
                    &self.orchestrator,
                    &self.mutation,
                )
                .await
            }
            Err(e) => {
                warn!(error = %e, "bulk update request rejected");
                BulkResponse::failed(&BulkError::from(e), dry_run)
            }
        }
    }

    pub async fn bulk_delete_json(&self, params: Value) -> BulkResponse {
        let dry_run = dry_run_flag(&params);
        match parse_bulk_delete(params) {
            Ok(request) => {
                bulk_delete(
                    &request,
                    &self.fetcher,
                    &self.mutator,
                    &self.orchestrator,
                    &self.mutation,
                )
                .await
            }
            Err(e) => {
                warn!(error = %e, "bulk delete request rejected");
                BulkResponse::failed(&BulkError::from(e), dry_run)
            }
        }
    }
}

fn dry_run_flag(params: &Value) -> bool {
    params.get("dryRun").and_then(Value::as_bool).unwrap_or(false)
}
