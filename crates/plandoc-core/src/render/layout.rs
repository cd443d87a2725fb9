//! Plan and summary layout into a [`DocumentModel`].

use super::{Block, DocumentModel, HeadingLevel};
use crate::plan::{Plan, Summary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Line under the title, e.g. which model produced the content.
    pub subtitle: String,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            subtitle: "Generated by Gemini".to_string(),
        }
    }
}

impl LayoutOptions {
    pub fn for_model(model: &str) -> Self {
        Self {
            subtitle: format!("Generated by {model}"),
        }
    }
}

/// Reduce model text to plain characters: markdown emphasis, inline code
/// ticks and leading heading markers are removed, tabs become spaces and
/// other control characters are dropped.
pub fn neutralize(text: &str) -> String {
    let text = text.replace("**", "").replace("__", "").replace('`', "");
    let text = text.trim_start().trim_start_matches('#');
    text.chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// One paragraph per non-blank line.
fn push_paragraphs(blocks: &mut Vec<Block>, text: &str) {
    for line in text.lines() {
        let para = neutralize(line);
        if !para.is_empty() {
            blocks.push(Block::Paragraph(para));
        }
    }
}

fn heading(level: HeadingLevel, text: impl Into<String>) -> Block {
    Block::Heading {
        level,
        text: text.into(),
    }
}

fn is_phase_label(name: &str) -> bool {
    name.get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("phase"))
}

pub fn plan_document(plan: &Plan, title: &str, options: &LayoutOptions) -> DocumentModel {
    let title = neutralize(title);
    let mut blocks = vec![
        Block::Title(title.clone()),
        Block::Subtitle(options.subtitle.clone()),
        heading(HeadingLevel::Section, "Overview"),
    ];
    push_paragraphs(&mut blocks, &plan.overview_text);

    if plan.phases.is_empty() {
        blocks.push(Block::Note("No phases were identified.".to_string()));
    }

    for (i, section) in plan.phases.iter().enumerate() {
        if i > 0 {
            blocks.push(Block::SectionBreak);
        }
        let name = neutralize(&section.phase.name);
        // Labels like "Phase 1" already carry the number.
        let phase_heading = if is_phase_label(&name) {
            name
        } else {
            format!("Phase {}: {name}", i + 1)
        };
        blocks.push(heading(HeadingLevel::Section, phase_heading));
        push_paragraphs(&mut blocks, &section.phase.raw_description);

        blocks.push(heading(HeadingLevel::Subsection, "Objectives"));
        if section.objectives.is_empty() {
            blocks.push(Block::Note(
                "No objectives were identified for this phase.".to_string(),
            ));
        }
        for (j, objective) in section.objectives.iter().enumerate() {
            blocks.push(Block::Label(format!(
                "{}. {}",
                j + 1,
                neutralize(&objective.title)
            )));
            for sub_point in &objective.sub_points {
                blocks.push(Block::Bullet {
                    depth: 1,
                    text: neutralize(sub_point),
                });
            }
        }

        blocks.push(heading(HeadingLevel::Subsection, "Resources"));
        if section.resources.is_empty() {
            blocks.push(Block::Note(
                "No resources were identified for this phase.".to_string(),
            ));
        }
        for category in &section.resources {
            blocks.push(Block::Label(neutralize(&category.name)));
            for item in &category.items {
                let name = neutralize(&item.name);
                let description = neutralize(&item.description);
                let text = if name.is_empty() {
                    description
                } else {
                    format!("{name}: {description}")
                };
                blocks.push(Block::Bullet { depth: 1, text });
            }
        }
    }

    DocumentModel { title, blocks }
}

pub fn summary_document(summary: &Summary, title: &str, options: &LayoutOptions) -> DocumentModel {
    let title = neutralize(title);
    let mut blocks = vec![
        Block::Title(format!("Summary Report: {title}")),
        Block::Subtitle(options.subtitle.clone()),
        heading(HeadingLevel::Section, "Overview"),
    ];
    push_paragraphs(&mut blocks, &summary.overview_text);

    let sections = [
        ("Key Themes", &summary.key_themes),
        ("Important Insights", &summary.insights),
        ("Actionable Takeaways", &summary.takeaways),
        ("Supporting Evidence", &summary.evidence),
    ];
    for (name, items) in sections {
        if items.is_empty() {
            continue;
        }
        blocks.push(heading(HeadingLevel::Section, name));
        for item in items {
            blocks.push(Block::Bullet {
                depth: 0,
                text: neutralize(item),
            });
        }
    }

    DocumentModel { title, blocks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Objective, Phase, PhaseSection, ResourceCategory, ResourceItem};

    fn section(name: &str) -> PhaseSection {
        PhaseSection {
            phase: Phase {
                name: name.to_string(),
                raw_description: "Do **things**".to_string(),
            },
            objectives: vec![Objective {
                title: "Survey".to_string(),
                sub_points: vec!["Map craters".to_string()],
            }],
            resources: vec![ResourceCategory {
                name: "Hardware".to_string(),
                items: vec![ResourceItem {
                    name: "Rover".to_string(),
                    description: "drives".to_string(),
                }],
            }],
        }
    }

    fn plan(phases: Vec<PhaseSection>) -> Plan {
        Plan {
            overview_text: "## Intro\n\nSecond paragraph".to_string(),
            phases_found: phases.len(),
            phases,
            warnings: vec![],
        }
    }

    #[test]
    fn neutralize_strips_markup_and_controls() {
        assert_eq!(neutralize("## **Bold** `code`"), "Bold code");
        assert_eq!(neutralize("a\tb\u{7}c"), "a bc");
        assert_eq!(neutralize("(parens) \\ kept"), "(parens) \\ kept");
    }

    #[test]
    fn phases_are_separated_by_breaks() {
        for p in 0usize..4 {
            let phases = (1..=p).map(|i| section(&format!("Phase {i}"))).collect();
            let doc = plan_document(&plan(phases), "T", &LayoutOptions::default());
            assert_eq!(doc.section_breaks(), p.saturating_sub(1));
        }
    }

    #[test]
    fn unnamed_resource_item_renders_description_only() {
        let mut s = section("Phase 1");
        s.resources[0].items.push(ResourceItem {
            name: String::new(),
            description: "spare parts".to_string(),
        });
        let doc = plan_document(&plan(vec![s]), "T", &LayoutOptions::default());
        let bullets: Vec<_> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Bullet { depth: 1, text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(bullets.contains(&"Rover: drives"));
        assert!(bullets.contains(&"spare parts"));
    }

    #[test]
    fn plan_layout_order() {
        let doc = plan_document(
            &plan(vec![section("Phase 1"), section("Preparation")]),
            "Lunar mining",
            &LayoutOptions::for_model("test-model"),
        );
        assert_eq!(doc.title, "Lunar mining");
        assert_eq!(doc.blocks[0], Block::Title("Lunar mining".into()));
        assert_eq!(doc.blocks[1], Block::Subtitle("Generated by test-model".into()));
        assert_eq!(doc.blocks[3], Block::Paragraph("Intro".into()));
        assert_eq!(doc.blocks[4], Block::Paragraph("Second paragraph".into()));
        assert_eq!(
            doc.headings(HeadingLevel::Section).collect::<Vec<_>>(),
            vec!["Overview", "Phase 1", "Phase 2: Preparation"]
        );
        assert!(doc.blocks.contains(&Block::Paragraph("Do things".into())));
        assert!(doc.blocks.contains(&Block::Label("1. Survey".into())));
        assert!(doc.blocks.contains(&Block::Bullet {
            depth: 1,
            text: "Rover: drives".into()
        }));
    }

    #[test]
    fn empty_sections_get_notes() {
        let mut empty = section("Phase 1");
        empty.objectives.clear();
        empty.resources.clear();
        let doc = plan_document(&plan(vec![empty]), "T", &LayoutOptions::default());
        let notes = doc
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::Note(_)))
            .count();
        assert_eq!(notes, 2);

        let doc = plan_document(&plan(vec![]), "T", &LayoutOptions::default());
        assert!(doc.blocks.contains(&Block::Note("No phases were identified.".into())));
    }

    #[test]
    fn summary_skips_empty_sections() {
        let summary = Summary {
            overview_text: "Overview".into(),
            key_themes: vec!["Theme".into()],
            insights: vec![],
            takeaways: vec!["Act".into()],
            evidence: vec![],
            warnings: vec![],
        };
        let doc = summary_document(&summary, "Lunar mining", &LayoutOptions::default());
        assert_eq!(doc.blocks[0], Block::Title("Summary Report: Lunar mining".into()));
        assert_eq!(
            doc.headings(HeadingLevel::Section).collect::<Vec<_>>(),
            vec!["Overview", "Key Themes", "Actionable Takeaways"]
        );
        assert_eq!(doc.section_breaks(), 0);
    }
}
