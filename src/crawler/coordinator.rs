//! Crawler coordinator - main crawl orchestration logic
//!
//! A fixed pool of workers shares one `Frontier` and one `RecordStore`.
//! Each worker loops:
//!
//! 1. Claim a URL from the frontier (waiting while others are in flight)
//! 2. Fetch it; the only suspension point besides waiting for work
//! 3. Extract records and links synchronously
//! 4. Enqueue discovered links, then merge records into the store
//! 5. Mark the URL done
//!
//! Links are enqueued before the URL is marked done so the frontier never
//! looks exhausted while a page's discoveries are still pending.

use crate::config::Config;
use crate::crawler::extractor::{ListingExtractor, SelectorExtractor};
use crate::crawler::fetcher::{FailureKind, FetchResult, HttpFetcher, PageFetcher};
use crate::crawler::frontier::{Frontier, FrontierLimits, QueuedUrl};
use crate::output::{CrawlReport, CrawlStatus, FailedPage};
use crate::records::{sort_records, DedupPolicy, Record, RecordStore};
use crate::state::PageState;
use crate::url::{PageUrl, SiteScope};
use crate::HarvestError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Pool size, bounds and record policy for a crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Number of concurrent workers (= maximum in-flight fetches)
    pub workers: usize,
    pub limits: FrontierLimits,
    pub dedup: DedupPolicy,
    /// Sort the final records by archive name, fond number, title
    pub sort_records: bool,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.crawler.max_concurrent_fetches.max(1) as usize,
            limits: FrontierLimits {
                max_pages: config.crawler.max_pages,
                max_depth: config.crawler.max_depth,
            },
            dedup: DedupPolicy::new(config.records.dedup_key.clone()),
            sort_records: config.crawler.sort_records,
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            limits: FrontierLimits::default(),
            dedup: DedupPolicy::default(),
            sort_records: true,
        }
    }
}

/// Records and report of a finished (or cancelled) crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub records: Vec<Record>,
    pub report: CrawlReport,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    settings: CrawlSettings,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
    cancel: CancellationToken,
    config_hash: Option<String>,
}

impl Coordinator {
    pub fn new(
        settings: CrawlSettings,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ListingExtractor>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            extractor,
            cancel: CancellationToken::new(),
            config_hash: None,
        }
    }

    /// Builds the HTTP fetcher and selector extractor described by `config`
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let seed = PageUrl::parse(&config.site.seed)?;
        let scope = SiteScope::for_seed(&seed, config.site.allowed_domains.iter().cloned());

        let fetcher = HttpFetcher::from_config(config)?;
        let extractor = SelectorExtractor::new(&config.extractor, scope)?;

        Ok(Self::new(
            CrawlSettings::from_config(config),
            Arc::new(fetcher),
            Arc::new(extractor),
        ))
    }

    /// Uses `token` as the external cancellation signal
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Hash of the configuration, carried into the report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Token that cancels this coordinator's crawls
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls from `seed` until the frontier is exhausted or cancelled
    ///
    /// Page failures never end the crawl; whatever was collected is
    /// returned even after cancellation.
    pub async fn run(&self, seed: PageUrl) -> CrawlOutcome {
        let started_at = Utc::now();
        let start_time = Instant::now();

        info!(
            "Starting crawl from {} with {} workers",
            seed, self.settings.workers
        );

        // A child token lets a crashed worker stop this run without
        // cancelling the caller's token
        let cancel = self.cancel.child_token();
        let frontier = Arc::new(Frontier::new(self.settings.limits));
        let store = Arc::new(RecordStore::new(self.settings.dedup.clone()));

        frontier.enqueue([seed.clone()], 0);

        let context = WorkerContext {
            frontier: Arc::clone(&frontier),
            store: Arc::clone(&store),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            cancel: cancel.clone(),
            start_time,
        };

        let mut workers = JoinSet::new();
        for id in 0..self.settings.workers {
            let context = context.clone();
            workers.spawn(worker_loop(context).instrument(info_span!("worker", id)));
        }

        let mut tally = WorkerTally::default();
        let mut worker_errors = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_tally) => tally.merge(worker_tally),
                Err(e) => {
                    error!("Crawl worker failed: {}", e);
                    worker_errors.push(e.to_string());
                    cancel.cancel();
                }
            }
        }

        let mut records = store.finalize();
        if self.settings.sort_records {
            sort_records(&mut records);
        }

        let stats = frontier.stats();
        let status = if cancel.is_cancelled() {
            CrawlStatus::Cancelled
        } else if stats.failed > 0 {
            CrawlStatus::CompletedWithFailures
        } else {
            CrawlStatus::Completed
        };

        tally.failures.sort_by(|a, b| a.url.cmp(&b.url));

        let report = CrawlReport {
            seed: seed.to_string(),
            started_at,
            finished_at: Utc::now(),
            status,
            config_hash: self.config_hash.clone(),
            pages_discovered: stats.discovered(),
            pages_processed: stats.processed,
            pages_failed: stats.failed,
            pages_skipped: stats.skipped,
            pages_abandoned: stats.abandoned,
            links_pruned_by_depth: stats.depth_pruned,
            records_extracted: tally.records_extracted,
            records_kept: records.len(),
            duplicates_discarded: tally.duplicates,
            extraction_warnings: tally.warnings,
            failed_pages: tally.failures,
            skipped_urls: url_strings(frontier.urls_in(PageState::Skipped)),
            abandoned_urls: url_strings(frontier.urls_in(PageState::Abandoned)),
            worker_errors,
        };

        info!(
            "Crawl {}: {} pages processed, {} failed, {} records kept in {:?}",
            report.status,
            report.pages_processed,
            report.pages_failed,
            report.records_kept,
            start_time.elapsed()
        );

        CrawlOutcome { records, report }
    }
}

/// Runs a complete crawl described by `config`
///
/// `cancel` stops the crawl early; the partial outcome is still returned.
pub async fn run_crawl(
    config: &Config,
    cancel: CancellationToken,
) -> Result<CrawlOutcome, HarvestError> {
    let seed = PageUrl::parse(&config.site.seed)?;
    let coordinator = Coordinator::from_config(config)?.with_cancellation(cancel);
    Ok(coordinator.run(seed).await)
}

fn url_strings(urls: Vec<PageUrl>) -> Vec<String> {
    urls.iter().map(PageUrl::to_string).collect()
}

#[derive(Clone)]
struct WorkerContext {
    frontier: Arc<Frontier>,
    store: Arc<RecordStore>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
    cancel: CancellationToken,
    start_time: Instant,
}

/// Per-worker counters, merged once every worker has stopped
#[derive(Debug, Default)]
struct WorkerTally {
    records_extracted: usize,
    duplicates: usize,
    warnings: usize,
    failures: Vec<FailedPage>,
}

impl WorkerTally {
    fn merge(&mut self, other: WorkerTally) {
        self.records_extracted += other.records_extracted;
        self.duplicates += other.duplicates;
        self.warnings += other.warnings;
        self.failures.extend(other.failures);
    }
}

async fn worker_loop(context: WorkerContext) -> WorkerTally {
    let mut tally = WorkerTally::default();

    while let Some(queued) = context.frontier.next(&context.cancel).await {
        debug!("Fetching {} (depth {})", queued.url, queued.depth);

        let fetched = tokio::select! {
            result = context.fetcher.fetch(&queued.url) => Some(result),
            _ = context.cancel.cancelled() => None,
        };

        let outcome = match fetched {
            Some(result) => process_result(&context, &queued, result, &mut tally),
            None => {
                debug!("Abandoning {}", queued.url);
                PageState::Abandoned
            }
        };

        if let Err(e) = context.frontier.mark_done(&queued.url, outcome) {
            error!("Frontier bookkeeping failed: {}", e);
        }

        if outcome == PageState::Processed {
            log_progress(&context);
        }
    }

    tally
}

/// Handles one fetch result and returns the URL's terminal state
fn process_result(
    context: &WorkerContext,
    queued: &QueuedUrl,
    result: FetchResult,
    tally: &mut WorkerTally,
) -> PageState {
    match result {
        FetchResult::Success {
            url,
            final_url,
            body,
        } => {
            if final_url != url {
                debug!("{} redirected to {}", url, final_url);
            }

            if !context.extractor.accepts(&final_url) {
                warn!("{} redirected off site to {}, not extracting", url, final_url);
                tally.failures.push(FailedPage {
                    url: url.to_string(),
                    kind: FailureKind::OffSite(final_url.to_string()),
                    attempts: 1,
                });
                return PageState::Failed;
            }

            let extraction = context.extractor.extract(&body, &final_url);

            for warning in &extraction.warnings {
                warn!("Skipping listing item: {}", warning);
            }
            tally.warnings += extraction.warnings.len();
            tally.records_extracted += extraction.records.len();

            let added = context
                .frontier
                .enqueue(extraction.discovered_urls, queued.depth + 1);

            match context.store.add(extraction.records) {
                Ok(merge) => {
                    tally.duplicates += merge.duplicates;
                    debug!(
                        "{}: {} new records, {} duplicates, {} new links",
                        url, merge.added, merge.duplicates, added
                    );
                }
                Err(e) => warn!("Dropping records from {}: {}", url, e),
            }

            PageState::Processed
        }
        FetchResult::Failure {
            url,
            kind,
            attempts,
        } => {
            warn!("Failed to fetch {} after {} attempts: {}", url, attempts, kind);
            tally.failures.push(FailedPage {
                url: url.to_string(),
                kind,
                attempts,
            });
            PageState::Failed
        }
    }
}

fn log_progress(context: &WorkerContext) {
    let stats = context.frontier.stats();
    if stats.processed % 10 != 0 {
        return;
    }

    let elapsed = context.start_time.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        stats.finished() as f64 / elapsed
    } else {
        0.0
    };

    info!(
        "Progress: {} pages processed, {} queued, {} in flight, {} records, {:.2} pages/sec",
        stats.processed,
        stats.queued,
        stats.in_flight,
        context.store.len(),
        rate
    );
}
