use url::Url;

/// Extracts the lowercase host of a URL, or `None` for host-less URLs
///
/// # Examples
///
/// ```
/// use url::Url;
/// use holdings_harvest::url::extract_domain;
///
/// let url = Url::parse("http://RusArchives.ru/state/list").unwrap();
/// assert_eq!(extract_domain(&url), Some("rusarchives.ru".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
