//! Objective extraction: numbered titles followed by dash sub-points.
//!
//! Per-line precedence:
//! 1. `<n>. <title>` (title optionally wrapped in `**`/`__`, optionally
//!    behind a markdown heading or emphasis prefix) opens a new objective.
//! 2. `- <text>` appends a sub-point to the open objective.
//! 3. Anything else is ignored, including dash lines before the first title.

use std::sync::LazyLock;

use regex::Regex;

use super::text::strip_emphasis;
use crate::plan::Objective;

static NUMBERED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#{1,6}\s*)?(?:\*\*|__)?\s*\d+\.\s+(.+)$").expect("valid objective regex")
});

/// Parse objectives out of a model reply. Returns `[]` when no numbered
/// title is present.
pub fn extract_objectives(text: &str) -> Vec<Objective> {
    let mut objectives = Vec::new();
    let mut current: Option<Objective> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(title) = numbered_title(line) {
            if let Some(done) = current.take() {
                objectives.push(done);
            }
            current = Some(Objective {
                title,
                sub_points: Vec::new(),
            });
        } else if let Some(rest) = line.strip_prefix('-') {
            let Some(open) = current.as_mut() else {
                continue;
            };
            // A line made only of dashes is a rule, not a sub-point.
            if rest.chars().all(|c| c == '-') {
                continue;
            }
            // Exactly one marker is consumed so serialized output reads back unchanged.
            let sub_point = strip_emphasis(rest.trim());
            if !sub_point.is_empty() {
                open.sub_points.push(sub_point);
            }
        }
    }

    if let Some(done) = current {
        objectives.push(done);
    }
    objectives
}

fn numbered_title(line: &str) -> Option<String> {
    let caps = NUMBERED_TITLE.captures(line)?;
    let title = strip_emphasis(&caps[1]);
    let title = title.trim_end_matches(':').trim_end();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Render objectives in the canonical reply format that
/// [`extract_objectives`] reads back unchanged.
pub fn serialize_objectives(objectives: &[Objective]) -> String {
    let mut out = String::new();
    for (i, objective) in objectives.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, objective.title));
        for sub_point in &objective.sub_points {
            out.push_str(&format!("   - {sub_point}\n"));
        }
    }
    out
}
