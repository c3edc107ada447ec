//! Output module for crawl results
//!
//! This module handles:
//! - Exporting the final record set as a CSV/TSV spreadsheet
//! - Printing the crawl report at the end of a run
//! - Writing a markdown version of the report

mod markdown;
mod spreadsheet;
pub mod stats;
mod traits;

pub use markdown::{format_markdown_report, generate_markdown_report};
pub use spreadsheet::{export_records, CsvSink, RecordTable, SpreadsheetFormat, COLUMNS};
pub use stats::{format_report, print_report};
pub use traits::{
    CrawlReport, CrawlStatus, ExportSink, FailedPage, OutputError, OutputResult,
};
