use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonical grouping key for a free-text ingredient label.
///
/// Lower-cases, strips diacritics, folds `œ`/`æ`, trims, then drops a single
/// trailing `s` from words longer than three characters so simple French
/// plurals share a key with their singular. The key is only for comparison;
/// callers keep the original label for display.
#[must_use]
pub fn normalize(input: &str) -> String {
    let mut key = fold(input);
    if key.ends_with('s') && key.chars().count() > 3 {
        key.pop();
    }
    key
}

/// Lower-case, accent-free, trimmed form of `input`, with no plural folding.
#[must_use]
pub fn fold(input: &str) -> String {
    let mut key = String::with_capacity(input.len());
    for c in input.to_lowercase().nfd() {
        match c {
            'œ' => key.push_str("oe"),
            'æ' => key.push_str("ae"),
            c if is_combining_mark(c) => {}
            c => key.push(c),
        }
    }

    key.trim().to_string()
}

/// [`normalize`] for a possibly-missing label; `None` maps to an empty key.
#[must_use]
pub fn normalize_opt(input: Option<&str>) -> String {
    input.map(normalize).unwrap_or_default()
}
