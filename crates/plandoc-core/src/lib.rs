//! Core of plandoc: prompt chain, text extraction and document rendering.
//!
//! ```text
//! GenerationRequest
//!     |
//!     v
//! PlanAssembler --generate(prompt)--> dyn ModelClient (rate limited)
//!     |                                   |
//!     |   <-------- raw reply ------------+
//!     |
//!     +--> extract::* (pure, total) --> Plan
//!                                         |
//!                                         v
//!                      layout::plan_document --> DocumentModel
//!                                                   |
//!                          DocumentBackend (pdf | text) --> RenderedDocument
//! ```

pub mod error;
pub mod extract;
pub mod model;
pub mod plan;
pub mod render;

pub use error::{PipelineError, Stage};
pub use model::{GeminiClient, ModelClient, ModelConfig, ModelError, RateLimiter, RateLimits};
pub use plan::{
    AssemblerConfig, GenerationRequest, InvalidRequest, Plan, PlanAssembler, PhaseLimit,
    Summary, SummaryRequest,
};
pub use render::{DocumentRenderer, OutputFormat, RenderError, RenderedDocument};
