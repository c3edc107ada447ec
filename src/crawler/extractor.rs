//! Listing extractor: HTML page -> records + URLs to crawl next
//!
//! Extraction is pure. The same body and page URL always yield the same
//! records, in document order, and the same discovered URLs.
//!
//! # Link rules
//!
//! **Followed:**
//! - pagination links matching a `next-page` selector
//! - detail links matching a `detail-links` selector, unless the link sits
//!   inside a listing item (that fond is already on this page)
//!
//! **Never followed:**
//! - `<a download>` links
//! - `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only hrefs
//! - hosts outside the site scope
//! - the page itself

use crate::config::{parse_selector, ExtractorConfig};
use crate::records::{InvalidRecord, Record, RecordDraft};
use crate::url::{PageUrl, SiteScope};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use thiserror::Error;

/// A listing item that could not become a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("item {index} on {page}: {source}")]
    InvalidItem {
        /// Position of the item among the page's items (0-based)
        index: usize,
        page: String,
        source: InvalidRecord,
    },
}

/// Everything pulled out of one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Valid records in document order
    pub records: Vec<Record>,
    /// In-scope URLs to crawl next, deduplicated, in document order
    pub discovered_urls: Vec<PageUrl>,
    /// Items that were skipped
    pub warnings: Vec<ExtractError>,
}

/// Turns a fetched page into records and follow-up URLs
pub trait ListingExtractor: Send + Sync {
    /// `page_url` is both the record source and the base for relative links
    fn extract(&self, body: &str, page_url: &PageUrl) -> Extraction;

    /// Whether a page at `page_url` belongs to the harvested site at all
    ///
    /// Pages reached through a redirect off the site are not extracted.
    fn accepts(&self, _page_url: &PageUrl) -> bool {
        true
    }
}

/// Read-only view of a parsed HTML node
trait HtmlNode {
    /// Text of the first descendant matching `selector`
    fn first_text(&self, selector: &Selector) -> Option<String>;

    /// `href` values of every descendant matching `selector`
    fn hrefs(&self, selector: &Selector) -> Vec<String>;
}

impl HtmlNode for ElementRef<'_> {
    fn first_text(&self, selector: &Selector) -> Option<String> {
        self.select(selector).next().map(node_text)
    }

    fn hrefs(&self, selector: &Selector) -> Vec<String> {
        self.select(selector).filter_map(followable_href).collect()
    }
}

impl HtmlNode for Html {
    fn first_text(&self, selector: &Selector) -> Option<String> {
        self.select(selector).next().map(node_text)
    }

    fn hrefs(&self, selector: &Selector) -> Vec<String> {
        self.select(selector).filter_map(followable_href).collect()
    }
}

/// Joins text nodes with spaces so `<td>Фонд<br>Р-1</td>` reads "Фонд Р-1"
fn node_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn followable_href(element: ElementRef<'_>) -> Option<String> {
    let value = element.value();
    if value.attr("download").is_some() {
        return None;
    }
    value.attr("href").map(str::to_string)
}

#[derive(Debug)]
struct FieldSelectors {
    archive_name: Selector,
    fond_number: Selector,
    title: Selector,
    date_range: Selector,
    description: Selector,
}

impl FieldSelectors {
    fn read<N: HtmlNode>(&self, node: &N) -> RecordDraft {
        RecordDraft {
            archive_name: node.first_text(&self.archive_name),
            fond_number: node.first_text(&self.fond_number),
            title: node.first_text(&self.title),
            date_range: node.first_text(&self.date_range),
            description: node.first_text(&self.description),
        }
    }
}

/// `ListingExtractor` driven by CSS selectors from `[extractor]`
#[derive(Debug)]
pub struct SelectorExtractor {
    item: Selector,
    fields: FieldSelectors,
    archive_name_fallback: Option<Selector>,
    next_page: Vec<Selector>,
    detail_links: Vec<Selector>,
    anchors: Selector,
    linked: Selector,
    scope: SiteScope,
}

impl SelectorExtractor {
    /// Compiles every selector up front
    pub fn new(config: &ExtractorConfig, scope: SiteScope) -> Result<Self, ConfigError> {
        let compile_all = |name: &str, selectors: &[String]| {
            selectors
                .iter()
                .map(|s| parse_selector(name, s))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Self {
            item: parse_selector("item-selector", &config.item_selector)?,
            fields: FieldSelectors {
                archive_name: parse_selector("archive-name", &config.archive_name)?,
                fond_number: parse_selector("fond-number", &config.fond_number)?,
                title: parse_selector("title", &config.title)?,
                date_range: parse_selector("date-range", &config.date_range)?,
                description: parse_selector("description", &config.description)?,
            },
            archive_name_fallback: config
                .archive_name_fallback
                .as_deref()
                .map(|s| parse_selector("archive-name-fallback", s))
                .transpose()?,
            next_page: compile_all("next-page", &config.next_page)?,
            detail_links: compile_all("detail-links", &config.detail_links)?,
            anchors: parse_selector("anchors", "a[href]")?,
            linked: parse_selector("linked", "[href]")?,
            scope,
        })
    }

    fn is_next_page(&self, element: &ElementRef<'_>) -> bool {
        self.next_page.iter().any(|s| s.matches(element))
    }

    fn is_detail_link(&self, element: &ElementRef<'_>) -> bool {
        self.detail_links.iter().any(|s| s.matches(element))
    }
}

impl ListingExtractor for SelectorExtractor {
    fn accepts(&self, page_url: &PageUrl) -> bool {
        self.scope.allows(page_url)
    }

    fn extract(&self, body: &str, page_url: &PageUrl) -> Extraction {
        let document = Html::parse_document(body);
        let mut extraction = Extraction::default();

        // Page-level archive name for listings that only name the archive once
        let fallback_archive = self
            .archive_name_fallback
            .as_ref()
            .and_then(|selector| document.first_text(selector));

        let mut item_links: HashSet<PageUrl> = HashSet::new();

        for (index, item) in document.select(&self.item).enumerate() {
            let mut draft = self.fields.read(&item);
            let has_archive = draft
                .archive_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty());
            if !has_archive {
                draft.archive_name = fallback_archive.clone();
            }

            for href in item.hrefs(&self.anchors) {
                if let Some(url) = page_url.join(&href) {
                    item_links.insert(url);
                }
            }

            match draft.into_record(page_url.clone()) {
                Ok(record) => extraction.records.push(record),
                Err(source) => extraction.warnings.push(ExtractError::InvalidItem {
                    index,
                    page: page_url.to_string(),
                    source,
                }),
            }
        }

        let mut seen: HashSet<PageUrl> = HashSet::new();
        for element in document.select(&self.linked) {
            let next_page = self.is_next_page(&element);
            if !next_page && !self.is_detail_link(&element) {
                continue;
            }

            let Some(url) = followable_href(element).and_then(|href| page_url.join(&href)) else {
                continue;
            };

            if !next_page && item_links.contains(&url) {
                continue;
            }

            if &url == page_url || !self.scope.allows(&url) {
                continue;
            }

            if seen.insert(url.clone()) {
                extraction.discovered_urls.push(url);
            }
        }

        extraction
    }
}
