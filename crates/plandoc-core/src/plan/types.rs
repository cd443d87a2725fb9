//! Request and plan record types.

use serde::Serialize;
use thiserror::Error;

use crate::error::Stage;

/// Titles longer than this are rejected; they end up in file names and
/// headings.
pub const MAX_TITLE_CHARS: usize = 200;

/// Rejected before any model call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("title is {len} characters long (max {max})")]
    TitleTooLong { len: usize, max: usize },
}

fn required(field: &'static str, value: impl Into<String>) -> Result<String, InvalidRequest> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InvalidRequest::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn title(value: impl Into<String>) -> Result<String, InvalidRequest> {
    let title = required("title", value)?;
    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(InvalidRequest::TitleTooLong {
            len,
            max: MAX_TITLE_CHARS,
        });
    }
    Ok(title)
}

/// Input for the plan pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    title: String,
    objective: String,
    seed_prompt: String,
}

impl GenerationRequest {
    /// Trim and validate all fields.
    pub fn new(
        title_value: impl Into<String>,
        objective: impl Into<String>,
        seed_prompt: impl Into<String>,
    ) -> Result<Self, InvalidRequest> {
        Ok(Self {
            title: title(title_value)?,
            objective: required("objective", objective)?,
            seed_prompt: required("strategicPrompt", seed_prompt)?,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn seed_prompt(&self) -> &str {
        &self.seed_prompt
    }
}

/// Input for the summary pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRequest {
    title: String,
    seed_prompt: String,
}

impl SummaryRequest {
    pub fn new(
        title_value: impl Into<String>,
        seed_prompt: impl Into<String>,
    ) -> Result<Self, InvalidRequest> {
        Ok(Self {
            title: title(title_value)?,
            seed_prompt: required("strategicPrompt", seed_prompt)?,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn seed_prompt(&self) -> &str {
        &self.seed_prompt
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub name: String,
    pub raw_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Objective {
    pub title: String,
    pub sub_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceItem {
    pub name: String,
    pub description: String,
}

/// Category names are unique within one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceCategory {
    pub name: String,
    pub items: Vec<ResourceItem>,
}

/// Everything generated for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSection {
    pub phase: Phase,
    pub objectives: Vec<Objective>,
    pub resources: Vec<ResourceCategory>,
}

/// A reply in which the extractor found no structure. The document simply
/// ends up emptier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionWarning {
    pub stage: Stage,
    pub phase: Option<String>,
    pub message: String,
}

/// The assembled plan, handed once to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Full overview reply (the prompts only see a truncated prefix).
    pub overview_text: String,
    pub phases: Vec<PhaseSection>,
    /// Phases extracted before the phase limit was applied.
    pub phases_found: usize,
    pub warnings: Vec<ExtractionWarning>,
}

impl Plan {
    pub fn objective_count(&self) -> usize {
        self.phases.iter().map(|p| p.objectives.len()).sum()
    }

    pub fn resource_item_count(&self) -> usize {
        self.phases
            .iter()
            .flat_map(|p| &p.resources)
            .map(|c| c.items.len())
            .sum()
    }
}

/// The assembled summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub overview_text: String,
    pub key_themes: Vec<String>,
    pub insights: Vec<String>,
    pub takeaways: Vec<String>,
    pub evidence: Vec<String>,
    pub warnings: Vec<ExtractionWarning>,
}
