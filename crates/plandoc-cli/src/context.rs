//! Shared application context: one assembler, one renderer and the shutdown
//! token, built once at startup and handed to the HTTP handlers and the
//! one-shot commands alike.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use plandoc_core::render::LayoutOptions;
use plandoc_core::{
    DocumentRenderer, GenerationRequest, ModelClient, OutputFormat, PhaseLimit, PipelineError,
    Plan, PlanAssembler, RenderError, RenderedDocument, Summary, SummaryRequest,
};

use crate::config::PlandocConfig;

/// Per-request knobs that override the configured defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderOptions {
    pub format: Option<OutputFormat>,
    pub max_phases: Option<usize>,
}

/// Assembled content plus the file it was rendered to.
#[derive(Debug)]
pub struct Generated<T> {
    pub content: T,
    pub document: RenderedDocument,
}

#[derive(Clone)]
pub struct AppContext {
    assembler: PlanAssembler,
    renderer: DocumentRenderer,
    shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        assembler: PlanAssembler,
        renderer: DocumentRenderer,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            assembler,
            renderer,
            shutdown,
        }
    }

    pub fn from_config(
        config: &PlandocConfig,
        client: Arc<dyn ModelClient>,
        shutdown: CancellationToken,
    ) -> Self {
        let layout = LayoutOptions::for_model(client.model());
        let assembler = PlanAssembler::new(client, config.assembler.clone());
        let renderer = DocumentRenderer::for_format(&config.output_dir, config.output_format)
            .with_layout(layout);
        Self::new(assembler, renderer, shutdown)
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub async fn generate_plan(
        &self,
        request: &GenerationRequest,
        options: RenderOptions,
    ) -> Result<Generated<Plan>, PipelineError> {
        let assembler = match options.max_phases {
            Some(max) => self.assembler.with_phase_limit(PhaseLimit::from_max(Some(max))),
            None => self.assembler.clone(),
        };
        let cancel = self.shutdown.child_token();
        let plan = assembler.assemble_plan(request, &cancel).await?;

        let renderer = self.renderer_for(options);
        let title = request.title().to_string();
        let (plan, document) = tokio::task::spawn_blocking(move || {
            let rendered = renderer.render_plan(&plan, &title);
            (plan, rendered)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?;

        Ok(Generated {
            content: plan,
            document: document?,
        })
    }

    pub async fn generate_summary(
        &self,
        request: &SummaryRequest,
        options: RenderOptions,
    ) -> Result<Generated<Summary>, PipelineError> {
        let cancel = self.shutdown.child_token();
        let summary = self.assembler.assemble_summary(request, &cancel).await?;

        let renderer = self.renderer_for(options);
        let title = request.title().to_string();
        let (summary, document) = tokio::task::spawn_blocking(move || {
            let rendered = renderer.render_summary(&summary, &title);
            (summary, rendered)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?;

        Ok(Generated {
            content: summary,
            document: document?,
        })
    }

    fn renderer_for(&self, options: RenderOptions) -> DocumentRenderer {
        match options.format {
            Some(format) => self.renderer.with_format(format),
            None => self.renderer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plandoc_core::AssemblerConfig;
    use plandoc_test_utils::{ScriptedModelClient, lunar};

    fn context(client: Arc<dyn ModelClient>, dir: &std::path::Path) -> AppContext {
        AppContext::new(
            PlanAssembler::new(client, AssemblerConfig::default()),
            DocumentRenderer::for_format(dir, OutputFormat::Pdf),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn generate_plan_writes_requested_format() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            ScriptedModelClient::new(lunar::plan_script()).into_arc(),
            dir.path(),
        );
        let request =
            GenerationRequest::new(lunar::TITLE, lunar::OBJECTIVE, lunar::SEED_PROMPT).unwrap();
        let generated = ctx
            .generate_plan(
                &request,
                RenderOptions {
                    format: Some(OutputFormat::Text),
                    max_phases: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(generated.content.phases.len(), lunar::PHASES);
        assert_eq!(generated.document.format, OutputFormat::Text);
        assert_eq!(generated.document.download_name, "Lunar_mining.txt");
        assert!(generated.document.path.exists());
    }

    #[tokio::test]
    async fn max_phases_limits_model_calls() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedModelClient::new(lunar::plan_script()).into_arc();
        let ctx = context(client.clone(), dir.path());
        let request =
            GenerationRequest::new(lunar::TITLE, lunar::OBJECTIVE, lunar::SEED_PROMPT).unwrap();
        let generated = ctx
            .generate_plan(
                &request,
                RenderOptions {
                    format: None,
                    max_phases: Some(1),
                },
            )
            .await
            .unwrap();

        assert_eq!(generated.content.phases.len(), 1);
        assert_eq!(generated.content.phases_found, lunar::PHASES);
        assert_eq!(client.call_count(), 4);
        assert_eq!(generated.document.format, OutputFormat::Pdf);
    }

    #[tokio::test]
    async fn shutdown_cancels_generation() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(plandoc_test_utils::PendingModelClient), dir.path());
        ctx.shutdown().cancel();
        let request = SummaryRequest::new("t", "p").unwrap();
        let err = ctx
            .generate_summary(&request, RenderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { .. }));
    }
}
