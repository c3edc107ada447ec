//! Markdown report generation
//!
//! This module writes a human-readable markdown version of the crawl
//! report, including failed pages and URLs dropped by the safety bounds.

use crate::output::traits::{CrawlReport, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Skipped or abandoned URLs listed per section before the rest is elided
///
/// Failed pages are always listed in full.
const MAX_LISTED: usize = 50;

/// Writes the markdown report to `output_path`
pub fn generate_markdown_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Holdings-Harvest Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", report.seed));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        report.duration_seconds()
    ));
    md.push_str(&format!("- **Status**: {}\n", report.status));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    if report.is_partial() {
        md.push_str("> The crawl was cancelled; the exported dataset is partial.\n\n");
    }

    // Pages
    md.push_str("## Pages\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Discovered | {} |\n", report.pages_discovered));
    md.push_str(&format!("| Processed | {} |\n", report.pages_processed));
    md.push_str(&format!("| Failed | {} |\n", report.pages_failed));
    md.push_str(&format!("| Skipped | {} |\n", report.pages_skipped));
    md.push_str(&format!("| Abandoned | {} |\n", report.pages_abandoned));
    md.push_str(&format!(
        "| Links beyond max depth | {} |\n\n",
        report.links_pruned_by_depth
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    // Records
    md.push_str("## Records\n\n");
    md.push_str(&format!("- **Extracted**: {}\n", report.records_extracted));
    md.push_str(&format!("- **Kept**: {}\n", report.records_kept));
    md.push_str(&format!(
        "- **Duplicates Discarded**: {}\n",
        report.duplicates_discarded
    ));
    md.push_str(&format!(
        "- **Invalid Items Skipped**: {}\n\n",
        report.extraction_warnings
    ));

    if report.has_failures() {
        md.push_str("## Failed Pages\n\n");
        md.push_str("| URL | Failure | Attempts |\n");
        md.push_str("|-----|---------|----------|\n");
        for page in &report.failed_pages {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page.url, page.kind, page.attempts
            ));
        }
        md.push('\n');
    }

    push_url_list(&mut md, "Skipped URLs", &report.skipped_urls);
    push_url_list(&mut md, "Abandoned URLs", &report.abandoned_urls);

    if !report.worker_errors.is_empty() {
        md.push_str("## Worker Errors\n\n");
        for error in &report.worker_errors {
            md.push_str(&format!("- {}\n", error));
        }
        md.push('\n');
    }

    md
}

fn push_url_list(md: &mut String, title: &str, urls: &[String]) {
    if urls.is_empty() {
        return;
    }

    md.push_str(&format!("## {}\n\n", title));
    for url in urls.iter().take(MAX_LISTED) {
        md.push_str(&format!("- {}\n", url));
    }
    if urls.len() > MAX_LISTED {
        md.push_str(&format!("\n... and {} more\n", urls.len() - MAX_LISTED));
    }
    md.push('\n');
}
