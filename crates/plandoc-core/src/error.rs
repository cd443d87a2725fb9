//! Pipeline error taxonomy.
//!
//! Extraction never fails: when a reply carries no recognizable structure the
//! pipeline records an [`ExtractionWarning`](crate::plan::ExtractionWarning)
//! and keeps going. Everything here aborts the request.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::model::ModelError;
use crate::plan::InvalidRequest;
use crate::render::RenderError;

/// One sequential step of the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Overview,
    Phases,
    Objectives,
    Resources,
    KeyThemes,
    Insights,
    Takeaways,
    Evidence,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Overview => "overview",
            Self::Phases => "phases",
            Self::Objectives => "objectives",
            Self::Resources => "resources",
            Self::KeyThemes => "key_themes",
            Self::Insights => "insights",
            Self::Takeaways => "takeaways",
            Self::Evidence => "evidence",
            Self::Render => "render",
        };
        f.write_str(s)
    }
}

/// Errors that abort a generation request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),

    #[error("model unavailable during {stage} stage: {message}")]
    UpstreamUnavailable { stage: Stage, message: String },

    #[error("model rate limit hit during {stage} stage: {message}")]
    UpstreamRateLimited {
        stage: Stage,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("pipeline cancelled during {stage} stage")]
    Cancelled { stage: Stage },

    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

impl PipelineError {
    /// Attach the failing stage to a model client error.
    pub fn from_model(stage: Stage, err: ModelError) -> Self {
        match err {
            ModelError::Unavailable { message } => Self::UpstreamUnavailable { stage, message },
            ModelError::RateLimited {
                message,
                retry_after,
            } => Self::UpstreamRateLimited {
                stage,
                message,
                retry_after,
            },
        }
    }

    /// Short machine-readable name, used in JSON error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::UpstreamRateLimited { .. } => "upstream_rate_limited",
            Self::Cancelled { .. } => "cancelled",
            Self::Render(_) => "render_failure",
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::UpstreamRateLimited { .. }
        )
    }
}
