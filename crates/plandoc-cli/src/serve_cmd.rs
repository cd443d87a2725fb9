use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

use plandoc_core::plan::ExtractionWarning;
use plandoc_core::{
    GenerationRequest, OutputFormat, PipelineError, RenderedDocument, SummaryRequest,
};

use crate::context::{AppContext, Generated, RenderOptions};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    retry_after: Option<Duration>,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: msg.into(),
            retry_after: None,
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: format!("{err:#}"),
            retry_after: None,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let (status, retry_after) = match &err {
            PipelineError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, None),
            PipelineError::UpstreamRateLimited { retry_after, .. } => {
                (StatusCode::TOO_MANY_REQUESTS, *retry_after)
            }
            PipelineError::UpstreamUnavailable { .. } => (StatusCode::BAD_GATEWAY, None),
            PipelineError::Cancelled { .. } => (StatusCode::SERVICE_UNAVAILABLE, None),
            PipelineError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let mut message = err.to_string();
        if err.is_retryable() {
            match retry_after {
                Some(wait) => message.push_str(&format!(
                    "; retry after {} seconds",
                    wait.as_secs().max(1)
                )),
                None => message.push_str("; retry later"),
            }
        }
        Self {
            status,
            kind: err.kind(),
            message,
            retry_after,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, kind = self.kind, "{}", self.message);
        } else {
            tracing::warn!(status = %self.status, kind = self.kind, "{}", self.message);
        }
        let mut body = serde_json::json!({ "error": self.message, "kind": self.kind });
        let mut response = match self.retry_after {
            Some(wait) => {
                let secs = wait.as_secs().max(1);
                body["retry_after_secs"] = secs.into();
                let mut response = (self.status, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            None => (self.status, Json(body)).into_response(),
        };
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request fields, accepted from the query string and from a JSON body.
/// Body fields win.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParams {
    pub title: Option<String>,
    pub objective: Option<String>,
    pub strategic_prompt: Option<String>,
    pub format: Option<OutputFormat>,
    pub max_phases: Option<usize>,
}

impl DocumentParams {
    fn merge(self, body: Self) -> Self {
        Self {
            title: body.title.or(self.title),
            objective: body.objective.or(self.objective),
            strategic_prompt: body.strategic_prompt.or(self.strategic_prompt),
            format: body.format.or(self.format),
            max_phases: body.max_phases.or(self.max_phases),
        }
    }

    fn options(&self) -> RenderOptions {
        RenderOptions {
            format: self.format,
            max_phases: self.max_phases,
        }
    }
}

/// JSON status payload, returned instead of the file when the client
/// sends `Accept: application/json`.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub document: RenderedDocument,
    pub generated_at: DateTime<Utc>,
    pub sections: BTreeMap<&'static str, usize>,
    pub warnings: Vec<ExtractionWarning>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(ctx: AppContext, allowed_origins: &[String]) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/generateDocument", post(generate_document))
        .route("/generateSummarization", post(generate_summarization))
        .with_state(ctx);
    match cors_layer(allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }
    if allowed_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers([header::CONTENT_DISPOSITION, header::RETRY_AFTER]),
    )
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(ctx: AppContext, allowed_origins: &[String], bind: &str, port: u16) -> Result<()> {
    let shutdown = ctx.shutdown().clone();
    let app = build_router(ctx, allowed_origins);
    let listener = tokio::net::TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("plandoc serve listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    tracing::info!("plandoc serve shut down");
    Ok(())
}

/// Resolves on Ctrl+C and cancels every in-flight pipeline.
async fn shutdown_signal(shutdown: tokio_util::sync::CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, cancelling in-flight requests");
    shutdown.cancel();
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Hello World" }))
}

fn parse_params(uri: &Uri, body: &Bytes) -> Result<DocumentParams, AppError> {
    let query = if uri.query().is_some() {
        Query::<DocumentParams>::try_from_uri(uri)
            .map_err(|e| AppError::bad_request(format!("invalid query string: {e}")))?
            .0
    } else {
        DocumentParams::default()
    };
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(query);
    }
    let body: DocumentParams = serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("invalid JSON body: {e}")))?;
    Ok(query.merge(body))
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

async fn generate_document(
    State(ctx): State<AppContext>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let params = parse_params(&uri, &body)?;
    let options = params.options();
    let request = GenerationRequest::new(
        params.title.unwrap_or_default(),
        params.objective.unwrap_or_default(),
        params.strategic_prompt.unwrap_or_default(),
    )
    .map_err(PipelineError::from)?;
    tracing::info!(title = %request.title(), format = ?options.format, "generateDocument");

    let Generated { content, document } = ctx.generate_plan(&request, options).await?;
    let sections = BTreeMap::from([
        ("phases", content.phases.len()),
        ("objectives", content.objective_count()),
        ("resource_items", content.resource_item_count()),
    ]);
    respond(&headers, document, sections, content.warnings).await
}

async fn generate_summarization(
    State(ctx): State<AppContext>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let params = parse_params(&uri, &body)?;
    let options = params.options();
    let request = SummaryRequest::new(
        params.title.unwrap_or_default(),
        params.strategic_prompt.unwrap_or_default(),
    )
    .map_err(PipelineError::from)?;
    tracing::info!(title = %request.title(), format = ?options.format, "generateSummarization");

    let Generated { content, document } = ctx.generate_summary(&request, options).await?;
    let sections = BTreeMap::from([
        ("key_themes", content.key_themes.len()),
        ("insights", content.insights.len()),
        ("takeaways", content.takeaways.len()),
        ("evidence", content.evidence.len()),
    ]);
    respond(&headers, document, sections, content.warnings).await
}

async fn respond(
    headers: &HeaderMap,
    document: RenderedDocument,
    sections: BTreeMap<&'static str, usize>,
    warnings: Vec<ExtractionWarning>,
) -> Result<Response, AppError> {
    if wants_json(headers) {
        return Ok(Json(DocumentResponse {
            status: "ok",
            document,
            generated_at: Utc::now(),
            sections,
            warnings,
        })
        .into_response());
    }

    let bytes = tokio::fs::read(&document.path)
        .await
        .with_context(|| format!("failed to read {}", document.path.display()))
        .map_err(AppError::internal)?;
    let disposition = HeaderValue::from_str(&content_disposition(&document.download_name))
        .context("invalid download name")
        .map_err(AppError::internal)?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(document.media_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `attachment` disposition with an ASCII fallback name and, for non-ASCII
/// names, an RFC 5987 `filename*` parameter.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_ascii() {
        return format!("attachment; filename=\"{fallback}\"");
    }
    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
