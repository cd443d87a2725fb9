//! Model client interface for hosted text-generation endpoints.
//!
//! The pipeline only ever needs "prompt in, text out". [`ModelClient`] is
//! that seam; [`GeminiClient`] is the production adapter and owns a
//! [`RateLimiter`] that paces calls to the provider's published ceilings.

pub mod gemini;
pub mod limiter;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

pub use gemini::GeminiClient;
pub use limiter::{RateLimiter, RateLimits};

/// Model identifier used when neither the CLI, env nor config names one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// REST root of the Gemini `generateContent` API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Failure of a single remote generation call. No local retry happens; the
/// caller decides.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("model endpoint unavailable: {message}")]
    Unavailable { message: String },

    #[error("model endpoint rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },
}

/// A hosted text-generation model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier, for logs and document subtitles.
    fn model(&self) -> &str;

    /// Send one prompt and return the raw reply text.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn ModelClient) {}
};

/// Connection settings for [`GeminiClient`].
///
/// There is deliberately no `Default`: the API key must be injected.
#[derive(Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub limits: RateLimits,
}

impl ModelConfig {
    /// Config for the default model and endpoint with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            limits: RateLimits::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limits(mut self, limits: RateLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("limits", &self.limits)
            .finish()
    }
}
