//! Name and URL canonicalization shared by catalog ingestion, upload and deck
//! resolution.
//!
//! Document stores treat `/` in a key as a path separator, so split-card
//! names (`"Fire // Ice"`) cannot be used verbatim as document keys.

/// Separator between the halves of a split card's display name.
pub const SPLIT_SEPARATOR: &str = "//";

/// Document key for a card display name.
///
/// Removes every split-card separator and leaves everything else untouched,
/// so `"Fire // Ice"` becomes `"Fire  Ice"`. Applying it twice is a no-op.
pub fn document_key(name: &str) -> String {
    if name.contains(SPLIT_SEPARATOR) {
        name.replace(SPLIT_SEPARATOR, "")
    } else {
        name.to_string()
    }
}

/// The part of `url` before the first `?`.
pub fn strip_query(url: &str) -> &str {
    match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    }
}
