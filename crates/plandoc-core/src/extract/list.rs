//! Flat list extraction for summary sections.

use std::sync::LazyLock;

use regex::Regex;

use super::text::strip_emphasis;

static ITEM_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#{1,6}\s*)?(?:[-*•]+\s*|\d+[.)]\s+)").expect("valid list item regex")
});

/// One entry per non-blank line, with bullets, list numbers and emphasis
/// removed. Lead-in lines ending in a colon ("Key themes:") are skipped.
pub fn extract_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let line = if line.starts_with("**") {
                std::borrow::Cow::Borrowed(line)
            } else {
                ITEM_PREFIX.replace(line, "")
            };
            let item = strip_emphasis(&line);
            if item.is_empty() || item.ends_with(':') {
                None
            } else {
                Some(item)
            }
        })
        .collect()
}
