//! Text cleanup applied to every extracted field
//!
//! Listing markup on archive portals is hand-edited: fields wrap across
//! lines, carry spreadsheet leftovers like `#VALUE!`, and mix guillemets
//! with straight quotes. These helpers turn raw node text into the values
//! stored on a `Record`.

/// Values that mean "no data" on the source pages
const PLACEHOLDERS: &[&str] = &["null", "none", "#value!", "-", "–", "—"];

/// Collapses whitespace runs (including newlines) into single spaces
///
/// Returns `None` when nothing but whitespace or a placeholder remains.
///
/// # Examples
///
/// ```
/// use holdings_harvest::records::clean_text;
///
/// assert_eq!(clean_text("  Фонд\n   Р-12 "), Some("Фонд Р-12".to_string()));
/// assert_eq!(clean_text("#VALUE!"), None);
/// ```
pub fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return None;
    }

    let lowered = collapsed.to_lowercase();
    if PLACEHOLDERS.contains(&lowered.as_str()) {
        return None;
    }

    Some(collapsed)
}

/// Cleans an archive institution name
///
/// Guillemets are replaced by straight quotes so that `«Архив»` and
/// `"Архив"` name the same institution.
pub fn clean_archive_name(raw: &str) -> Option<String> {
    clean_text(raw).map(|name| name.replace(['«', '»', '“', '”'], "\""))
}

/// Cleans a free-text description, upper-casing its first letter
pub fn clean_description(raw: &str) -> Option<String> {
    clean_text(raw).map(|text| {
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => text,
        }
    })
}
