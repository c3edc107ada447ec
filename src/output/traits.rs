//! Output traits and types
//!
//! This module defines the export sink interface and the crawl report
//! handed to the report writers.

use crate::crawler::FailureKind;
use crate::output::RecordTable;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the finished record table
pub trait ExportSink {
    /// Writes the whole table; the sink owns every format detail
    fn write_table(&mut self, table: &RecordTable) -> OutputResult<()>;
}

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// The frontier was exhausted and every page was processed
    Completed,
    /// The frontier was exhausted but some pages failed permanently
    CompletedWithFailures,
    /// Stopped by the cancellation signal; results are partial
    Cancelled,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStatus::Completed => "completed",
            CrawlStatus::CompletedWithFailures => "completed with failures",
            CrawlStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page that never yielded a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPage {
    pub url: String,
    pub kind: FailureKind,
    /// Attempts made, first one included
    pub attempts: u32,
}

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    // Run metadata
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: CrawlStatus,
    pub config_hash: Option<String>,

    // Pages
    pub pages_discovered: usize,
    pub pages_processed: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub pages_abandoned: usize,
    pub links_pruned_by_depth: usize,

    // Records
    pub records_extracted: usize,
    pub records_kept: usize,
    pub duplicates_discarded: usize,
    pub extraction_warnings: usize,

    // Details
    pub failed_pages: Vec<FailedPage>,
    pub skipped_urls: Vec<String>,
    pub abandoned_urls: Vec<String>,
    pub worker_errors: Vec<String>,
}

impl CrawlReport {
    /// Wall-clock duration of the run in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Pages fetched, successfully or not
    pub fn pages_attempted(&self) -> usize {
        self.pages_processed + self.pages_failed
    }

    /// Returns the success rate as a percentage (0.0 - 100.0)
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_attempted();
        if attempted == 0 {
            0.0
        } else {
            (self.pages_processed as f64 / attempted as f64) * 100.0
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_pages.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.status == CrawlStatus::Cancelled
    }
}
