//! Plan model, prompt templates and the sequential assembler.

pub mod assembler;
pub mod prompts;
pub mod types;

pub use assembler::{AssemblerConfig, PhaseLimit, PlanAssembler};
pub use types::{
    ExtractionWarning, GenerationRequest, InvalidRequest, MAX_TITLE_CHARS, Objective, Phase,
    PhaseSection, Plan, ResourceCategory, ResourceItem, Summary, SummaryRequest,
};
