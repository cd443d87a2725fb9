//! Prompt templates, one per pipeline stage.
//!
//! Each template spells out the reply format its extractor in
//! [`crate::extract`] expects. Changing a format here means changing the
//! matching extractor.

use crate::error::Stage;
use crate::plan::Phase;

/// Phases are requested one per line as `Phase N: ...`.
pub fn phases_prompt(title: &str, overview_context: &str) -> String {
    let mut prompt = String::with_capacity(512 + overview_context.len());
    prompt.push_str(&format!("This is the title: {title}\n"));
    prompt.push_str(&format!(
        "This is the strategic overview: {overview_context}\n\n"
    ));
    prompt.push_str(
        "Break the work into distinct phases that cover every stage of the project, \
         from preparation to completion. Include a timeline and a brief description \
         for each phase.\n\n",
    );
    prompt.push_str("Put each phase on its own line, formatted like this:\n");
    prompt.push_str("Phase 1: Name (timeline) - description\n");
    prompt.push_str("Phase 2: Name (timeline) - description\n");
    prompt
}

/// Objectives are requested as numbered titles with five dash sub-points.
pub fn objectives_prompt(title: &str, running_objectives: &str, phase: &Phase) -> String {
    let mut prompt = String::with_capacity(768 + running_objectives.len());
    prompt.push_str(&format!(
        "For the title '{title}' with main objectives '{running_objectives}', \
         during the phase '{}: {}',\n\n",
        phase.name, phase.raw_description
    ));
    prompt.push_str(
        "Generate detailed and specific objectives. Each objective should include a \
         short title, followed by 5 detailed sub-points explaining the objective.\n\n",
    );
    prompt.push_str("Format them like this:\n");
    prompt.push_str("1. Objective Title\n");
    for i in 1..=5 {
        prompt.push_str(&format!("   - Sub-point {i}\n"));
    }
    prompt
}

/// Resources are requested as bold category headings with dash items.
pub fn resources_prompt(title: &str, phase: &Phase) -> String {
    let mut prompt = String::with_capacity(768);
    prompt.push_str(&format!(
        "For the project '{title}', in the phase '{}: {}',\n\n",
        phase.name, phase.raw_description
    ));
    prompt.push_str(
        "Generate a structured list of all required resources. Include key resource \
         categories such as Hardware, Personnel, Equipment, Money, Minerals, etc. \
         Provide a brief description for each resource, explaining its role.\n\n",
    );
    prompt.push_str("Format them like this:\n");
    prompt.push_str("**Category Name**\n");
    prompt.push_str("- Resource 1: Description\n");
    prompt.push_str("- Resource 2: Description\n");
    prompt
}

/// The summary section a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySection {
    KeyThemes,
    Insights,
    Takeaways,
    Evidence,
}

impl SummarySection {
    pub const ALL: [Self; 4] = [
        Self::KeyThemes,
        Self::Insights,
        Self::Takeaways,
        Self::Evidence,
    ];

    pub fn stage(self) -> Stage {
        match self {
            Self::KeyThemes => Stage::KeyThemes,
            Self::Insights => Stage::Insights,
            Self::Takeaways => Stage::Takeaways,
            Self::Evidence => Stage::Evidence,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::KeyThemes => {
                "Identify the key themes or topics discussed in the document. \
                 Return a list of main themes without excessive detail."
            }
            Self::Insights => {
                "Extract the most important insights from the document. \
                 Focus on key learnings, statistics, or conclusions."
            }
            Self::Takeaways => {
                "Provide the most actionable takeaways from the document. \
                 These should be recommendations or practical applications."
            }
            Self::Evidence => {
                "Identify any supporting evidence or references mentioned in the document. \
                 This can include key statistics, studies, quotes, or expert opinions."
            }
        }
    }
}

/// Summary sections are requested as a flat dash list.
pub fn summary_prompt(section: SummarySection, title: &str, overview_context: &str) -> String {
    let mut prompt = String::with_capacity(512 + overview_context.len());
    prompt.push_str(&format!(
        "This is a summary of a document related to {title}:\n\"{overview_context}\"\n\n"
    ));
    prompt.push_str(section.instruction());
    prompt.push_str("\n\nReturn one item per line, each starting with \"- \".\n");
    prompt
}
