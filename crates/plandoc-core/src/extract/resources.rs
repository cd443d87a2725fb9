//! Resource extraction: emphasized category headings with dash items.
//!
//! Per-line precedence:
//! 1. A line wholly wrapped in `**` or `__` (optionally ending with a colon)
//!    opens a category. A repeated heading re-opens the first-seen one.
//! 2. A dash line adds an item to the open category, split at the first
//!    colon into name and description. N dash lines give N items.
//! 3. Anything else is ignored, including dash lines before any category.

use std::sync::LazyLock;

use regex::Regex;

use super::text::strip_emphasis;
use crate::plan::{ResourceCategory, ResourceItem};

/// Description used for items that carry no `name: description` split.
pub const NO_DESCRIPTION: &str = "No description provided.";

static CATEGORY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*|__)(.+?)(?:\*\*|__):?$").expect("valid category regex")
});

/// Parse resource categories out of a model reply.
pub fn extract_resources(text: &str) -> Vec<ResourceCategory> {
    let mut categories: Vec<ResourceCategory> = Vec::new();
    let mut current: Option<usize> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(name) = category_name(line) {
            let idx = match categories.iter().position(|c| c.name == name) {
                Some(idx) => idx,
                None => {
                    categories.push(ResourceCategory {
                        name,
                        items: Vec::new(),
                    });
                    categories.len() - 1
                }
            };
            current = Some(idx);
        } else if let Some(rest) = line.strip_prefix('-') {
            let Some(idx) = current else {
                continue;
            };
            categories[idx].items.push(parse_item(rest));
        }
    }

    categories
}

fn category_name(line: &str) -> Option<String> {
    let caps = CATEGORY_LINE.captures(line)?;
    let inner = &caps[1];
    // "**A** and **B**" is not a heading.
    if inner.contains("**") || inner.contains("__") {
        return None;
    }
    let name = strip_emphasis(inner);
    let name = name.trim_end_matches(':').trim_end();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Every dash line under a category is an item. The name may come out
/// empty (`- : text` or a bare `-`).
fn parse_item(rest: &str) -> ResourceItem {
    let (raw_name, raw_description) = match rest.split_once(':') {
        Some((name, description)) => (name, Some(description)),
        None => (rest, None),
    };

    let name = strip_emphasis(raw_name);
    let description = raw_description
        .map(strip_emphasis)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    ResourceItem { name, description }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, description: &str) -> ResourceItem {
        ResourceItem {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn category_with_n_items_preserves_order() {
        let text = "\
**Hardware**
- Drill rig: Bores into regolith
- Sifter: Separates fines
- Furnace: Heats samples to release He-3
";
        let parsed = extract_resources(text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "Hardware");
        assert_eq!(
            parsed[0].items,
            vec![
                item("Drill rig", "Bores into regolith"),
                item("Sifter", "Separates fines"),
                item("Furnace", "Heats samples to release He-3"),
            ]
        );
    }

    #[test]
    fn missing_colon_gets_placeholder_description() {
        let parsed = extract_resources("**Personnel**\n- Geologist");
        assert_eq!(parsed[0].items, vec![item("Geologist", NO_DESCRIPTION)]);
    }

    #[test]
    fn empty_description_gets_placeholder() {
        let parsed = extract_resources("**Personnel**\n- Pilot:");
        assert_eq!(parsed[0].items, vec![item("Pilot", NO_DESCRIPTION)]);
    }

    #[test]
    fn splits_on_first_colon_only() {
        let parsed = extract_resources("**Schedule**\n- Launch window: 2031-04-01 12:00 UTC");
        assert_eq!(
            parsed[0].items,
            vec![item("Launch window", "2031-04-01 12:00 UTC")]
        );
    }

    #[test]
    fn every_dash_line_under_a_category_is_an_item() {
        let text = "**Hardware**\n- Drill: digs\n- : unnamed\n-\n- Rover: drives";
        let parsed = extract_resources(text);
        assert_eq!(
            parsed[0].items,
            vec![
                item("Drill", "digs"),
                item("", "unnamed"),
                item("", NO_DESCRIPTION),
                item("Rover", "drives"),
            ]
        );
    }

    #[test]
    fn dash_lines_before_any_category_are_dropped() {
        let text = "- Orphan: no home\n**Money**\n- Grant: seed funding";
        let parsed = extract_resources(text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].items, vec![item("Grant", "seed funding")]);
    }

    #[test]
    fn bold_item_names_are_cleaned() {
        let parsed = extract_resources("**Hardware:**\n- **GPU cluster:** Runs the models");
        assert_eq!(parsed[0].name, "Hardware");
        assert_eq!(parsed[0].items, vec![item("GPU cluster", "Runs the models")]);
    }

    #[test]
    fn underscore_headings_and_trailing_colon_outside() {
        let parsed = extract_resources("__Minerals__:\n- Ilmenite: Oxygen source");
        assert_eq!(parsed[0].name, "Minerals");
        assert_eq!(parsed[0].items.len(), 1);
    }

    #[test]
    fn repeated_category_reopens_first_seen() {
        let text = "\
**Hardware**
- Drill: digs
**Personnel**
- Pilot: flies
**Hardware**
- Rover: drives
";
        let parsed = extract_resources(text);
        let names: Vec<_> = parsed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Hardware", "Personnel"]);
        assert_eq!(
            parsed[0].items,
            vec![item("Drill", "digs"), item("Rover", "drives")]
        );
    }

    #[test]
    fn inline_bold_prose_is_not_a_category() {
        let parsed = extract_resources("**A** and **B**\n- item: x");
        assert!(parsed.is_empty());
    }

    #[test]
    fn no_structure_yields_empty() {
        assert!(extract_resources("").is_empty());
        assert!(extract_resources("We need many things.").is_empty());
    }

    #[test]
    fn category_without_items_is_kept() {
        let parsed = extract_resources("**Money**\nSome prose.");
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].items.is_empty());
    }
}
