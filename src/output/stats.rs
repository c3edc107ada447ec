//! Crawl report printing
//!
//! Renders a `CrawlReport` to stdout at the end of a run. Every failed page
//! is listed; skipped URLs are elided past `MAX_SKIPPED_LISTED`.

use crate::output::traits::CrawlReport;
use std::fmt::Write;

/// Skipped URLs listed before the rest is elided
const MAX_SKIPPED_LISTED: usize = 20;

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Formats the report exactly as `print_report` shows it
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &CrawlReport) -> std::fmt::Result {
    writeln!(out, "=== Crawl Report ===\n")?;

    writeln!(out, "Run:")?;
    writeln!(out, "  Seed: {}", report.seed)?;
    writeln!(out, "  Status: {}", report.status)?;
    writeln!(out, "  Duration: {} seconds", report.duration_seconds())?;
    if let Some(hash) = &report.config_hash {
        writeln!(out, "  Config hash: {}", hash)?;
    }
    writeln!(out)?;

    writeln!(out, "Pages:")?;
    writeln!(out, "  Discovered: {}", report.pages_discovered)?;
    writeln!(out, "  Processed: {}", report.pages_processed)?;
    writeln!(out, "  Failed: {}", report.pages_failed)?;
    writeln!(out, "  Skipped: {}", report.pages_skipped)?;
    if report.pages_abandoned > 0 {
        writeln!(out, "  Abandoned: {}", report.pages_abandoned)?;
    }
    if report.links_pruned_by_depth > 0 {
        writeln!(out, "  Links beyond max depth: {}", report.links_pruned_by_depth)?;
    }
    writeln!(out)?;

    writeln!(out, "Records:")?;
    writeln!(out, "  Extracted: {}", report.records_extracted)?;
    writeln!(out, "  Kept: {}", report.records_kept)?;
    writeln!(out, "  Duplicates discarded: {}", report.duplicates_discarded)?;
    writeln!(out, "  Invalid items skipped: {}", report.extraction_warnings)?;
    writeln!(out)?;

    if report.has_failures() {
        writeln!(out, "Failed Pages ({}):", report.failed_pages.len())?;
        for page in &report.failed_pages {
            writeln!(out, "  - {} ({}, {} attempts)", page.url, page.kind, page.attempts)?;
        }
        writeln!(out)?;
    }

    if !report.skipped_urls.is_empty() {
        writeln!(out, "Skipped URLs ({}):", report.skipped_urls.len())?;
        for url in report.skipped_urls.iter().take(MAX_SKIPPED_LISTED) {
            writeln!(out, "  - {}", url)?;
        }
        if report.skipped_urls.len() > MAX_SKIPPED_LISTED {
            writeln!(
                out,
                "  ... and {} more",
                report.skipped_urls.len() - MAX_SKIPPED_LISTED
            )?;
        }
        writeln!(out)?;
    }

    if !report.worker_errors.is_empty() {
        writeln!(out, "Worker Errors:")?;
        for error in &report.worker_errors {
            writeln!(out, "  - {}", error)?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        report.success_rate(),
        report.pages_processed,
        report.pages_attempted()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FailureKind;
    use crate::output::traits::tests::sample_report;
    use crate::output::FailedPage;

    #[test]
    fn test_print_report_does_not_panic() {
        print_report(&sample_report());

        let empty = CrawlReport {
            failed_pages: vec![],
            pages_processed: 0,
            pages_failed: 0,
            ..sample_report()
        };
        print_report(&empty);
    }

    #[test]
    fn test_every_failed_page_is_listed() {
        let failed_pages: Vec<FailedPage> = (0..45)
            .map(|i| FailedPage {
                url: format!("http://rusarchives.ru/state/list?page={}", i),
                kind: FailureKind::HttpError(500),
                attempts: 4,
            })
            .collect();
        let report = CrawlReport {
            pages_failed: failed_pages.len(),
            failed_pages,
            ..sample_report()
        };

        let text = format_report(&report);
        assert!(text.contains("Failed Pages (45):"));
        for i in 0..45 {
            let line = format!("  - http://rusarchives.ru/state/list?page={} (HTTP 500", i);
            assert!(text.contains(&line), "missing {}", line);
        }
        assert!(!text.contains("more"));
    }

    #[test]
    fn test_skipped_urls_are_elided() {
        let report = CrawlReport {
            skipped_urls: (0..30)
                .map(|i| format!("http://rusarchives.ru/state/list?page={}", i))
                .collect(),
            ..sample_report()
        };

        let text = format_report(&report);
        assert!(text.contains("Skipped URLs (30):"));
        assert!(text.contains("... and 10 more"));
    }
}
