use crate::UrlError;
use url::Url;

/// Query parameters that never change page content and are dropped
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "yclid"];

/// Normalizes a URL into the form used as the frontier's dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Lowercase the host, drop the default port
/// 4. Normalize path:
///    - Remove dot segments (`.` and `..`)
///    - Collapse repeated slashes
///    - Empty path becomes `/`
/// 5. Remove fragment
/// 6. Remove tracking query parameters (`utm_*`, `fbclid`, ...)
/// 7. Sort remaining query parameters by name, then value
/// 8. Remove empty query string
///
/// The trailing slash is kept: many portals serve `/list` and `/list/`
/// as different resources.
///
/// # Examples
///
/// ```
/// use holdings_harvest::url::normalize_url;
///
/// let url = normalize_url("HTTP://RusArchives.RU:80//state/./list?page=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://rusarchives.ru/state/list?a=1&page=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // The url crate already lowercases hosts of special schemes and strips
    // default ports; a missing host is still possible for odd inputs.
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Removes dot segments and duplicate slashes, keeping a trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..") {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts the rest
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_scheme() {
        let result = normalize_url("http://rusarchives.ru/state/list").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/state/list");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("http://CFC.RusArchives.ru/CFC-search/").unwrap();
        assert_eq!(result.as_str(), "http://cfc.rusarchives.ru/CFC-search/");
    }

    #[test]
    fn test_default_port_removed_custom_port_kept() {
        let result = normalize_url("http://rusarchives.ru:80/a").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/a");

        let result = normalize_url("http://127.0.0.1:8080/a").unwrap();
        assert_eq!(result.as_str(), "http://127.0.0.1:8080/a");
    }

    #[test]
    fn test_trailing_slash_kept() {
        let result = normalize_url("http://rusarchives.ru/state/list/").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/state/list/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("http://rusarchives.ru").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("http://rusarchives.ru/state/list#federal").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/state/list");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("http://rusarchives.ru/list?page=3&region=10").unwrap();
        let swapped = normalize_url("http://rusarchives.ru/list?region=10&page=3").unwrap();
        assert_eq!(result, swapped);
        assert_eq!(result.as_str(), "http://rusarchives.ru/list?page=3&region=10");
    }

    #[test]
    fn test_repeated_param_sorted_by_value() {
        let result = normalize_url("http://rusarchives.ru/list?f=2&f=1").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/list?f=1&f=2");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result =
            normalize_url("http://rusarchives.ru/list?utm_source=mail&page=1&fbclid=x").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/list?page=1");

        let result = normalize_url("http://rusarchives.ru/list?utm_campaign=a").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/list");
    }

    #[test]
    fn test_dot_segments_and_slashes() {
        let result = normalize_url("http://rusarchives.ru//a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "http://rusarchives.ru/b/c");
    }

    #[test]
    fn test_encoded_query_value_round_trips() {
        let result = normalize_url("http://rusarchives.ru/search?q=a%26b").unwrap();
        let pairs: Vec<_> = result.query_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, "a&b");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://rusarchives.ru/file");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(
            normalize_url("not a url").unwrap_err(),
            UrlError::Parse(_)
        ));
    }
}
