//! Crawler module for listing pages
//!
//! This module contains the crawl-and-extract pipeline:
//! - HTTP fetching with retries and a politeness throttle
//! - Record and link extraction from listing HTML
//! - The shared frontier of URLs to visit
//! - Overall crawl coordination across a worker pool

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod retry;
mod throttle;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome, CrawlSettings};
pub use extractor::{ExtractError, Extraction, ListingExtractor, SelectorExtractor};
pub use fetcher::{build_http_client, FailureKind, FetchResult, HttpFetcher, PageFetcher};
pub use frontier::{Frontier, FrontierError, FrontierLimits, FrontierStats, QueuedUrl};
pub use retry::{AttemptOutcome, AttemptState, RetryPolicy};
pub use throttle::Throttle;
