//! Gemini REST adapter.
//!
//! Calls `{base_url}/{model}:generateContent` directly with `reqwest`. The
//! API key travels in the `x-goog-api-key` header so it never ends up in a
//! URL, an error message or a log line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::limiter::{RateLimiter, estimate_tokens};
use super::{ModelClient, ModelConfig, ModelError};

/// [`ModelClient`] backed by the Gemini HTTP API.
pub struct GeminiClient {
    client: Client,
    config: ModelConfig,
    limiter: RateLimiter,
}

impl GeminiClient {
    /// Build a client; fails only if the HTTP client cannot be constructed.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        let limiter = RateLimiter::new(config.limits);
        tracing::debug!(model = %config.model, limits = ?limiter.limits(), "model client ready");
        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.limiter.acquire(estimate_tokens(prompt)).await;

        let body = GenerateContentRequest::from_prompt(prompt);
        let started = std::time::Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ModelError::Unavailable {
                // Strip the URL: reqwest errors embed it.
                message: format!("request failed: {}", err.without_url()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            tracing::warn!(
                model = %self.config.model,
                status = status.as_u16(),
                "model call returned an error status"
            );
            return Err(map_http_error(status, &body_text, retry_after));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|err| ModelError::Unavailable {
                message: format!("failed to decode response: {}", err.without_url()),
            })?;

        let text = extract_text_response(parsed)?;
        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            reply_chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model call completed"
        );
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

fn extract_text_response(response: GenerateContentResponse) -> Result<String, ModelError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ModelError::Unavailable {
            message: format!("prompt blocked by provider: {reason}"),
        });
    }

    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    // An empty reply is not a transport failure; the extractors turn it into
    // warnings and the document comes out emptier.
    if text.trim().is_empty() {
        tracing::warn!("model returned no text");
        return Ok(String::new());
    }
    Ok(text)
}

fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> ModelError {
    let (provider_status, message) = match serde_json::from_str::<ErrorWrapper>(body) {
        Ok(wrapper) => {
            let provider_status = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            let message = if provider_status.is_empty() {
                msg
            } else {
                format!("{provider_status}: {msg}")
            };
            (provider_status, message)
        }
        Err(_) => (String::new(), format!("HTTP {}: {}", status.as_u16(), body.trim())),
    };

    if status == StatusCode::TOO_MANY_REQUESTS || provider_status == "RESOURCE_EXHAUSTED" {
        ModelError::RateLimited {
            message,
            retry_after,
        }
    } else {
        ModelError::Unavailable { message }
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RateLimits;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn request_body_has_gemini_shape() {
        let body = serde_json::to_value(GenerateContentRequest::from_prompt("hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })
        );
    }

    #[test]
    fn extracts_and_joins_text_parts() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#,
        );
        assert_eq!(extract_text_response(resp).unwrap(), "Hello, world");
    }

    #[test]
    fn empty_replies_degrade_to_empty_text() {
        for body in [
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"  \n"}]}}]}"#,
            r#"{}"#,
        ] {
            assert_eq!(extract_text_response(parse(body)).unwrap(), "", "{body}");
        }
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        match extract_text_response(resp) {
            Err(ModelError::Unavailable { message }) => assert!(message.contains("SAFETY")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn too_many_requests_maps_to_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            body,
            Some(Duration::from_secs(30)),
        );
        match err {
            ModelError::RateLimited {
                message,
                retry_after,
            } => {
                assert_eq!(message, "RESOURCE_EXHAUSTED: Quota exceeded");
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn resource_exhausted_without_429_is_still_rate_limited() {
        let body = r#"{"error":{"message":"slow down","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            map_http_error(StatusCode::FORBIDDEN, body, None),
            ModelError::RateLimited { .. }
        ));
    }

    #[test]
    fn server_errors_map_to_unavailable() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down", None);
        match err {
            ModelError::Unavailable { message } => {
                assert_eq!(message, "HTTP 502: upstream down");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn retry_after_parses_seconds_only() {
        let secs = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&secs)), Some(Duration::from_secs(12)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn endpoint_joins_base_url_and_model() {
        let client = GeminiClient::new(
            ModelConfig::new("k")
                .with_model("gemini-pro")
                .with_base_url("http://localhost:1/models/"),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:1/models/gemini-pro:generateContent"
        );
        assert_eq!(client.model(), "gemini-pro");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable_without_leaking_key() {
        let client = GeminiClient::new(
            ModelConfig::new("secret-key-123")
                .with_base_url("http://127.0.0.1:1/models")
                .with_timeout(Duration::from_secs(2))
                .with_limits(RateLimits::UNLIMITED),
        )
        .unwrap();

        match client.generate("hi").await {
            Err(ModelError::Unavailable { message }) => {
                assert!(!message.contains("secret-key-123"), "{message}");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
