use serde::Deserialize;

/// Main configuration structure for Holdings-Harvest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of simultaneous in-flight fetches
    pub max_concurrent_fetches: u32,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Safety bound on the number of pages fetched
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Safety bound on link depth from the seed (seed is depth 0)
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Minimum time between the starts of two requests (milliseconds)
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Sort the final record set by archive name, fond number, title
    #[serde(default = "default_true")]
    pub sort_records: bool,
}

/// Retry and backoff policy for transient fetch failures
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds); doubles per retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// The portal being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Top-level listing page the crawl starts from
    pub seed: String,

    /// Extra host patterns (e.g. "*.rusarchives.ru") links may lead to
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

/// CSS selectors describing the listing markup
///
/// Field selectors are evaluated inside each item matched by
/// `item-selector`; `archive-name-fallback` is evaluated against the whole
/// page and used when an item carries no archive name of its own.
///
/// The default field selectors (`.fond-item`, `.fond-title`, ...) are
/// placeholders for a generic fond listing and match nothing on a real
/// portal; set them for the site being harvested. The pager defaults follow
/// Drupal's pager markup. A Drupal views table, for instance:
///
/// ```toml
/// [extractor]
/// item-selector = "table.views-table tbody tr"
/// archive-name-fallback = "table.views-table caption"
/// fond-number = "td.views-field-field-fond-number"
/// title = "td.views-field-title"
/// date-range = "td.views-field-field-dates"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractorConfig {
    pub item_selector: String,
    pub archive_name: String,
    pub archive_name_fallback: Option<String>,
    pub fond_number: String,
    pub title: String,
    pub date_range: String,
    pub description: String,
    pub next_page: Vec<String>,
    pub detail_links: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            item_selector: ".fond-item".to_string(),
            archive_name: ".archive-name".to_string(),
            archive_name_fallback: Some("h1.archive-name".to_string()),
            fond_number: ".fond-number".to_string(),
            title: ".fond-title".to_string(),
            date_range: ".fond-dates".to_string(),
            description: ".fond-description".to_string(),
            // Numbered pager links keep later pages reachable when one page fails
            next_page: vec![
                "a[rel~='next']".to_string(),
                "li.pager-next a".to_string(),
                "ul.pager li.pager-item a".to_string(),
            ],
            detail_links: vec!["a.fond-link".to_string()],
        }
    }
}

/// A record field that can take part in the dedup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyField {
    ArchiveName,
    FondNumber,
    Title,
    DateRange,
    Description,
}

/// Record store policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RecordsConfig {
    /// Fields forming the composite dedup key, in order
    pub dedup_key: Vec<KeyField>,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            dedup_key: vec![KeyField::ArchiveName, KeyField::FondNumber, KeyField::Title],
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the spreadsheet to write (.csv or .tsv)
    pub spreadsheet_path: String,

    /// Path of the markdown crawl report
    #[serde(default)]
    pub summary_path: Option<String>,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_min_request_interval_ms() -> u64 {
    25
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}
