//! URL handling module for Holdings-Harvest
//!
//! This module provides URL normalization, the `PageUrl` dedup key used by
//! the frontier, wildcard domain matching, and the site scope that keeps a
//! crawl from drifting off the portal.

mod domain;
mod matcher;
mod normalize;

use crate::UrlError;
use std::fmt;
use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::{normalize_parsed, normalize_url};

/// A normalized absolute http(s) URL
///
/// Two `PageUrl`s are equal iff their normalized forms are equal (scheme,
/// host, port, path, sorted query parameters), which makes the type usable
/// directly as a set key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageUrl(Url);

impl PageUrl {
    /// Parses and normalizes a URL string
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        normalize_url(input).map(Self)
    }

    /// Resolves a (possibly relative) href against this URL
    ///
    /// Returns `None` for hrefs that should never be followed: empty,
    /// fragment-only, `javascript:`, `mailto:`, `tel:`, `data:`, or anything
    /// that does not resolve to http(s).
    pub fn join(&self, href: &str) -> Option<Self> {
        let href = href.trim();

        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        let lowered = href.to_ascii_lowercase();
        if ["javascript:", "mailto:", "tel:", "data:"]
            .iter()
            .any(|scheme| lowered.starts_with(scheme))
        {
            return None;
        }

        let joined = self.0.join(href).ok()?;
        normalize_parsed(joined).ok().map(Self)
    }

    /// The lowercase host of this URL
    pub fn host(&self) -> &str {
        // Normalization guarantees a host is present
        self.0.host_str().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl TryFrom<Url> for PageUrl {
    type Error = UrlError;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        normalize_parsed(url).map(Self)
    }
}

/// The set of hosts a crawl may visit
///
/// The seed host is always in scope; additional hosts are admitted through
/// wildcard patterns such as `*.rusarchives.ru`.
#[derive(Debug, Clone, Default)]
pub struct SiteScope {
    patterns: Vec<String>,
}

impl SiteScope {
    /// Creates a scope from allowed-domain patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a scope admitting the seed's host plus the given patterns
    pub fn for_seed<I, S>(seed: &PageUrl, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scope = Self::new(patterns);
        scope.patterns.push(seed.host().to_string());
        scope
    }

    /// Returns true if `url` may be crawled
    ///
    /// Only the configured patterns decide; the host a link was found on
    /// grants nothing, so a redirect off the portal cannot widen the crawl.
    pub fn allows(&self, url: &PageUrl) -> bool {
        extract_domain(url.as_url())
            .map(|domain| self.patterns.iter().any(|p| matches_wildcard(p, &domain)))
            .unwrap_or(false)
    }
}
