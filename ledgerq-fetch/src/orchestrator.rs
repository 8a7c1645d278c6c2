//! Fetch orchestrator: assemble every record in a date window from a
//! page-limited remote source.
//!
//! The remote caps results per request scope as well as per page, so a
//! window is first cut into chunks (`split_window`) and each chunk is paged
//! independently. Requests are strictly sequential with a fixed delay
//! between them.
//!
//! Stop rules per chunk:
//! - a page shorter than `page_size` ends the chunk
//! - `max_pages` / `max_records` end the whole fetch with `has_more = true`
//! - the first fetch error ends the whole fetch; records so far are kept

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ledgerq_core::Record;
use tracing::{debug, info, warn};

use crate::window::{DateWindow, split_window};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_CHUNK_DAYS: u32 = 31;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// One page of remote records. Transport, auth and retries live behind this.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// `page` is 1-based.
    async fn fetch_page(
        &self,
        window: &DateWindow,
        page: usize,
        page_size: usize,
    ) -> anyhow::Result<Vec<Record>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Records per request; clamped to `1..=MAX_PAGE_SIZE`
    pub page_size: usize,
    /// Span of each chunk in days
    pub chunk_days: u32,
    /// Pause between successive requests
    pub delay: Duration,
    /// Total request budget across all chunks
    pub max_pages: Option<usize>,
    pub max_records: Option<usize>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_days: DEFAULT_CHUNK_DAYS,
            delay: DEFAULT_DELAY,
            max_pages: None,
            max_records: None,
        }
    }
}

impl FetchOptions {
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Deduplicated by id, first-seen order
    pub records: Vec<Record>,
    pub pages_used: usize,
    /// A safety limit stopped the fetch before the window was exhausted
    pub has_more: bool,
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchOrchestrator {
    options: FetchOptions,
}

impl FetchOrchestrator {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    pub async fn fetch_window<F: PageFetcher + ?Sized>(
        &self,
        window: &DateWindow,
        fetcher: &F,
    ) -> FetchOutcome {
        let page_size = self.options.effective_page_size();
        let chunks = split_window(window, self.options.chunk_days);
        let last_chunk = chunks.len().saturating_sub(1);

        let mut raw: Vec<Record> = Vec::new();
        let mut pages_used = 0usize;
        let mut has_more = false;
        let mut error = None;

        'chunks: for (ci, chunk) in chunks.iter().enumerate() {
            let mut page = 1usize;
            loop {
                if let Some(max) = self.options.max_pages {
                    if pages_used >= max {
                        debug!(max_pages = max, "page budget exhausted");
                        has_more = true;
                        break 'chunks;
                    }
                }

                if pages_used > 0 && !self.options.delay.is_zero() {
                    tokio::time::sleep(self.options.delay).await;
                }

                let batch = match fetcher.fetch_page(chunk, page, page_size).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!(chunk = %chunk, page, error = %e, "page fetch failed");
                        error = Some(format!("{e:#}"));
                        break 'chunks;
                    }
                };
                pages_used += 1;

                let got = batch.len();
                debug!(chunk = %chunk, page, got, "fetched page");
                raw.extend(batch);

                let chunk_done = got < page_size;
                if let Some(max) = self.options.max_records {
                    if raw.len() >= max {
                        if !(chunk_done && ci == last_chunk) {
                            has_more = true;
                        }
                        break 'chunks;
                    }
                }
                if chunk_done {
                    break;
                }
                page += 1;
            }
        }

        let mut records = dedup_by_id(raw);
        if let Some(max) = self.options.max_records {
            if records.len() > max {
                records.truncate(max);
                has_more = true;
            }
        }

        info!(
            window = %window,
            chunks = chunks.len(),
            pages_used,
            records = records.len(),
            has_more,
            failed = error.is_some(),
            "fetch complete"
        );

        FetchOutcome {
            records,
            pages_used,
            has_more,
            error,
        }
    }
}

/// Drop later records whose id was already seen; order is otherwise kept.
pub fn dedup_by_id(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::with_capacity(records.len());
    records.into_iter().filter(|r| seen.insert(r.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::NaiveDate;
    use ledgerq_core::Kind;
    use std::sync::Mutex;

    /// Serves records from memory, paged per requested window.
    struct MemoryLedger {
        records: Vec<Record>,
        calls: Mutex<Vec<(DateWindow, usize)>>,
        fail_on_call: Option<usize>,
    }

    impl MemoryLedger {
        fn new(records: Vec<Record>) -> Self {
            Self {
                records,
                calls: Mutex::new(Vec::new()),
                fail_on_call: None,
            }
        }

        fn calls(&self) -> Vec<(DateWindow, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for MemoryLedger {
        async fn fetch_page(
            &self,
            window: &DateWindow,
            page: usize,
            page_size: usize,
        ) -> anyhow::Result<Vec<Record>> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((*window, page));
                calls.len()
            };
            if self.fail_on_call == Some(n) {
                bail!("remote returned 503");
            }
            let in_window: Vec<Record> = self
                .records
                .iter()
                .filter(|r| {
                    NaiveDate::parse_from_str(r.date_key(), "%Y-%m-%d")
                        .map(|d| window.contains(d))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            Ok(in_window
                .into_iter()
                .skip((page - 1) * page_size)
                .take(page_size)
                .collect())
        }
    }

    fn daily(start: &str, count: usize) -> Vec<Record> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
        (0..count)
            .map(|i| {
                let date = start + chrono::Duration::days(i as i64);
                Record::new(i as i64 + 1, Kind::Outflow, date.to_string(), 100.0)
            })
            .collect()
    }

    fn no_delay() -> FetchOptions {
        FetchOptions {
            delay: Duration::ZERO,
            ..FetchOptions::default()
        }
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::parse(start, end).unwrap()
    }

    #[tokio::test]
    async fn walks_pages_until_short_page() {
        let ledger = MemoryLedger::new(daily("2024-01-01", 25));
        let opts = FetchOptions {
            page_size: 10,
            ..no_delay()
        };
        let out = FetchOrchestrator::new(opts)
            .fetch_window(&window("2024-01-01", "2024-01-31"), &ledger)
            .await;

        assert_eq!(out.records.len(), 25);
        assert_eq!(out.pages_used, 3);
        assert!(!out.has_more);
        assert!(!out.has_error());
        let pages: Vec<usize> = ledger.calls().into_iter().map(|(_, p)| p).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn chunks_long_windows() {
        let ledger = MemoryLedger::new(daily("2024-01-01", 60));
        let out = FetchOrchestrator::new(no_delay())
            .fetch_window(&window("2024-01-01", "2024-03-31"), &ledger)
            .await;

        assert_eq!(out.records.len(), 60);
        let chunk_starts: Vec<String> = ledger
            .calls()
            .into_iter()
            .map(|(w, _)| w.start.to_string())
            .collect();
        assert_eq!(chunk_starts, vec!["2024-01-01", "2024-02-01", "2024-03-03"]);
    }

    #[tokio::test]
    async fn page_budget_sets_has_more() {
        let ledger = MemoryLedger::new(daily("2024-01-01", 25));
        let opts = FetchOptions {
            page_size: 10,
            max_pages: Some(2),
            ..no_delay()
        };
        let out = FetchOrchestrator::new(opts)
            .fetch_window(&window("2024-01-01", "2024-01-31"), &ledger)
            .await;

        assert_eq!(out.records.len(), 20);
        assert_eq!(out.pages_used, 2);
        assert!(out.has_more);
        assert!(!out.has_error());
    }

    #[tokio::test]
    async fn record_cap_truncates_exactly() {
        let ledger = MemoryLedger::new(daily("2024-01-01", 25));
        let opts = FetchOptions {
            page_size: 10,
            max_records: Some(15),
            ..no_delay()
        };
        let out = FetchOrchestrator::new(opts)
            .fetch_window(&window("2024-01-01", "2024-01-31"), &ledger)
            .await;

        assert_eq!(out.records.len(), 15);
        assert!(out.has_more);
        assert_eq!(out.records.last().unwrap().id, 15);
    }

    #[tokio::test]
    async fn record_cap_equal_to_total_is_not_more() {
        let ledger = MemoryLedger::new(daily("2024-01-01", 5));
        let opts = FetchOptions {
            max_records: Some(5),
            ..no_delay()
        };
        let out = FetchOrchestrator::new(opts)
            .fetch_window(&window("2024-01-01", "2024-01-31"), &ledger)
            .await;
        assert_eq!(out.records.len(), 5);
        assert!(!out.has_more);
    }

    #[tokio::test]
    async fn error_keeps_collected_records() {
        let mut ledger = MemoryLedger::new(daily("2024-01-01", 25));
        ledger.fail_on_call = Some(2);
        let opts = FetchOptions {
            page_size: 10,
            ..no_delay()
        };
        let out = FetchOrchestrator::new(opts)
            .fetch_window(&window("2024-01-01", "2024-01-31"), &ledger)
            .await;

        assert_eq!(out.records.len(), 10);
        assert_eq!(out.pages_used, 1);
        assert_eq!(out.error.as_deref(), Some("remote returned 503"));
        // no retry
        assert_eq!(ledger.calls().len(), 2);
    }

    #[tokio::test]
    async fn empty_window_makes_no_requests() {
        let ledger = MemoryLedger::new(daily("2024-01-01", 5));
        let out = FetchOrchestrator::new(no_delay())
            .fetch_window(&window("2024-02-01", "2024-01-01"), &ledger)
            .await;
        assert!(out.records.is_empty());
        assert_eq!(out.pages_used, 0);
        assert!(ledger.calls().is_empty());
    }

    #[test]
    fn page_size_is_capped() {
        let opts = FetchOptions {
            page_size: 500,
            ..FetchOptions::default()
        };
        assert_eq!(opts.effective_page_size(), 100);
    }

    #[test]
    fn dedup_keeps_first_seen() {
        let a = Record::new(1, Kind::Outflow, "2024-01-01", 1.0);
        let b = Record::new(2, Kind::Outflow, "2024-01-02", 2.0);
        let a_again = Record::new(1, Kind::Outflow, "2024-01-01", 99.0);
        let out = dedup_by_id(vec![a.clone(), b.clone(), a_again]);
        assert_eq!(out, vec![a, b]);
    }
}
