/// Checks if a host matches an allowed-domain pattern
///
/// Two pattern forms are supported:
/// 1. Exact: "rusarchives.ru" matches only "rusarchives.ru"
/// 2. Wildcard: "*.rusarchives.ru" matches the bare domain and every
///    subdomain below it ("cfc.rusarchives.ru", "a.b.rusarchives.ru")
///
/// Comparison ignores ASCII case on both sides.
///
/// # Examples
///
/// ```
/// use holdings_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("rusarchives.ru", "RusArchives.ru"));
/// assert!(matches_wildcard("*.rusarchives.ru", "cfc.rusarchives.ru"));
/// assert!(!matches_wildcard("*.rusarchives.ru", "archives.ru"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let candidate = candidate.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            let base = base.to_ascii_lowercase();
            if candidate == base {
                return true;
            }
            // Subdomain must end at a label boundary
            candidate
                .strip_suffix(base.as_str())
                .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
        }
        None => candidate == pattern.to_ascii_lowercase(),
    }
}
