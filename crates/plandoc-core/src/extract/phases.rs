//! Phase extraction: `label: description` lines.
//!
//! A candidate is any line that, after list markers and emphasis are
//! stripped, has a non-empty label (at most [`MAX_LABEL_CHARS`] characters)
//! before its first colon and non-empty text after it. When at least one
//! candidate label starts with "Phase", only those are kept; otherwise all
//! candidates are phases.

use std::sync::LazyLock;

use regex::Regex;

use super::text::strip_emphasis;
use crate::plan::Phase;

/// Longer "labels" are prose that happens to contain a colon.
pub const MAX_LABEL_CHARS: usize = 80;

static LIST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#{1,6}\s*)?(?:[-*•]\s+)?(?:\d+[.)]\s+)?").expect("valid list prefix regex")
});

/// Parse phases out of a model reply, in reply order.
pub fn extract_phases(text: &str) -> Vec<Phase> {
    let candidates: Vec<Phase> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(candidate)
        .collect();

    let has_phase_labels = candidates.iter().any(|p| is_phase_label(&p.name));
    if has_phase_labels {
        candidates
            .into_iter()
            .filter(|p| is_phase_label(&p.name))
            .collect()
    } else {
        candidates
    }
}

fn candidate(line: &str) -> Option<Phase> {
    let body = LIST_PREFIX.replace(line, "");
    let body = strip_emphasis(&body);
    let (label, description) = body.split_once(':')?;
    let label = strip_emphasis(label);
    let description = strip_emphasis(description);
    if label.is_empty() || description.is_empty() || label.chars().count() > MAX_LABEL_CHARS {
        return None;
    }
    Some(Phase {
        name: label,
        raw_description: description,
    })
}

fn is_phase_label(label: &str) -> bool {
    label
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("phase"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(phases: &[Phase]) -> Vec<&str> {
        phases.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn phase_labels_win_over_other_colon_lines() {
        let text = "\
**Phase 1: Preparation (Months 1-6)**
- Timeline: Months 1-6
- Goal: Select landing site
**Phase 2: Landing (Month 7)**
- Timeline: Month 7
";
        let phases = extract_phases(text);
        assert_eq!(names(&phases), vec!["Phase 1", "Phase 2"]);
        assert_eq!(phases[0].raw_description, "Preparation (Months 1-6)");
        assert_eq!(phases[1].raw_description, "Landing (Month 7)");
    }

    #[test]
    fn falls_back_to_any_label_line() {
        let text = "Preparation: gather the team\nExecution: do the work\nClosing remarks";
        let phases = extract_phases(text);
        assert_eq!(names(&phases), vec!["Preparation", "Execution"]);
        assert_eq!(phases[1].raw_description, "do the work");
    }

    #[test]
    fn numbered_and_bulleted_prefixes_are_stripped() {
        let text = "1. **Phase A:** Survey\n* Phase B: Build\n### Phase C: Operate";
        assert_eq!(names(&extract_phases(text)), vec!["Phase A", "Phase B", "Phase C"]);
    }

    #[test]
    fn lines_without_both_sides_are_skipped() {
        let text = "Phase 1:\n: orphan description\nno colon here";
        assert!(extract_phases(text).is_empty());
    }

    #[test]
    fn long_prose_labels_are_skipped() {
        let prose = format!("{}: tail", "word ".repeat(30));
        assert!(extract_phases(&prose).is_empty());
    }

    #[test]
    fn case_insensitive_phase_prefix() {
        let text = "PHASE ONE: launch\nBudget: large";
        assert_eq!(names(&extract_phases(text)), vec!["PHASE ONE"]);
    }

    #[test]
    fn empty_input_yields_no_phases() {
        assert!(extract_phases("").is_empty());
    }
}
