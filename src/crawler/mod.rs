//! Crawler module for session page fetching and processing
//!
//! This module contains the core loading logic, including:
//! - Page fetching through a headless browser or plain HTTP
//! - Session extraction from rendered markup
//! - Per-session retry with linear backoff
//! - Worker pool coordination and merging into the catalog

mod browser;
mod coordinator;
mod fetcher;
mod job;
mod parser;

pub use browser::BrowserFetcher;
pub use coordinator::{dedupe_ids, load_live, Coordinator, FetchOutcome};
pub use fetcher::{build_http_client, HttpFetcher, PageFetcher};
pub use job::{session_url, FetchJob, RetryPolicy};
pub use parser::SessionExtractor;
