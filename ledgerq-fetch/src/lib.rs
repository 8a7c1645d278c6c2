//! ledgerq-fetch: date windows and the paged, chunked fetch orchestrator.

pub mod orchestrator;
pub mod window;

pub use orchestrator::{
    DEFAULT_CHUNK_DAYS, DEFAULT_DELAY, DEFAULT_PAGE_SIZE, FetchOptions, FetchOrchestrator,
    FetchOutcome, MAX_PAGE_SIZE, PageFetcher, dedup_by_id,
};
pub use window::{DateWindow, WindowError, split_window};
