//! Small string helpers shared by the extractors and the renderer.

/// Remove markdown emphasis markers (`**`, `__`, and stray leading/trailing
/// `*` or `_`) and trim.
pub fn strip_emphasis(s: &str) -> String {
    let without_pairs = s.replace("**", "").replace("__", "");
    without_pairs
        .trim()
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .to_string()
}

/// First `max_chars` characters of `s`. Never splits a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
