//! Sequential prompt chain: overview, phases, then objectives and resources
//! for each phase.
//!
//! Calls within one request are strictly ordered; each prompt depends on an
//! earlier reply. Any model failure aborts the request and no partial plan
//! is returned. Empty extractions do not abort; they become
//! [`ExtractionWarning`]s.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::prompts::{self, SummarySection};
use super::types::{
    ExtractionWarning, GenerationRequest, Phase, PhaseSection, Plan, Summary, SummaryRequest,
};
use crate::error::{PipelineError, Stage};
use crate::extract::{
    extract_list, extract_objectives, extract_phases, extract_resources, serialize_objectives,
    truncate_chars,
};
use crate::model::ModelClient;

/// How many of the extracted phases get objectives and resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseLimit {
    #[default]
    All,
    First(usize),
}

impl PhaseLimit {
    /// `None` and `Some(0)` both mean "no limit".
    pub fn from_max(max: Option<usize>) -> Self {
        match max {
            Some(n) if n > 0 => Self::First(n),
            _ => Self::All,
        }
    }

    fn apply(self, mut phases: Vec<Phase>) -> Vec<Phase> {
        if let Self::First(n) = self {
            phases.truncate(n);
        }
        phases
    }
}

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Characters of the overview reply passed into later prompts.
    pub overview_context_chars: usize,
    pub phase_limit: PhaseLimit,
    /// Extra wait between consecutive calls of one request, on top of the
    /// client's own rate limiter.
    pub pacing_delay: Duration,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            overview_context_chars: 300,
            phase_limit: PhaseLimit::All,
            pacing_delay: Duration::ZERO,
        }
    }
}

/// Drives the prompt chain against a [`ModelClient`]. Cheap to share; holds
/// no per-request state.
#[derive(Clone)]
pub struct PlanAssembler {
    client: Arc<dyn ModelClient>,
    config: AssemblerConfig,
}

impl PlanAssembler {
    pub fn new(client: Arc<dyn ModelClient>, config: AssemblerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Same assembler with a different phase limit, for per-request overrides.
    pub fn with_phase_limit(&self, phase_limit: PhaseLimit) -> Self {
        let mut config = self.config.clone();
        config.phase_limit = phase_limit;
        Self {
            client: Arc::clone(&self.client),
            config,
        }
    }

    pub async fn assemble_plan(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Plan, PipelineError> {
        let mut run = Run::new(self, cancel);
        let title = request.title();

        // 1. Overview.
        let overview_text = run.call(Stage::Overview, request.seed_prompt()).await?;
        if overview_text.trim().is_empty() {
            run.warn(Stage::Overview, None, "model returned an empty overview");
        }
        let context = truncate_chars(&overview_text, self.config.overview_context_chars);

        // 2. Phases.
        let reply = run
            .call(Stage::Phases, &prompts::phases_prompt(title, context))
            .await?;
        let extracted = extract_phases(&reply);
        let phases_found = extracted.len();
        let phases = self.config.phase_limit.apply(extracted);
        if phases.is_empty() {
            run.warn(Stage::Phases, None, "no phases found in model reply");
        }
        tracing::info!(
            title = %title,
            phases_found,
            phases_used = phases.len(),
            "extracted phases"
        );

        // 3. Objectives then resources, phase by phase.
        let mut running_objectives = request.objective().to_string();
        let mut sections = Vec::with_capacity(phases.len());
        for (index, phase) in phases.into_iter().enumerate() {
            let reply = run
                .call(
                    Stage::Objectives,
                    &prompts::objectives_prompt(title, &running_objectives, &phase),
                )
                .await?;
            let objectives = extract_objectives(&reply);
            if objectives.is_empty() {
                run.warn(
                    Stage::Objectives,
                    Some(&phase.name),
                    "no numbered objectives found in model reply",
                );
            } else {
                running_objectives = serialize_objectives(&objectives);
            }

            let reply = run
                .call(Stage::Resources, &prompts::resources_prompt(title, &phase))
                .await?;
            let resources = extract_resources(&reply);
            if resources.is_empty() {
                run.warn(
                    Stage::Resources,
                    Some(&phase.name),
                    "no resource categories found in model reply",
                );
            }

            tracing::debug!(
                phase_index = index + 1,
                phase = %phase.name,
                objectives = objectives.len(),
                resource_categories = resources.len(),
                "phase assembled"
            );
            sections.push(PhaseSection {
                phase,
                objectives,
                resources,
            });
        }

        // 4. Assemble.
        let plan = Plan {
            overview_text,
            phases: sections,
            phases_found,
            warnings: run.warnings,
        };
        tracing::info!(
            title = %title,
            phases = plan.phases.len(),
            objectives = plan.objective_count(),
            resource_items = plan.resource_item_count(),
            warnings = plan.warnings.len(),
            model_calls = run.calls,
            "plan assembled"
        );
        Ok(plan)
    }

    pub async fn assemble_summary(
        &self,
        request: &SummaryRequest,
        cancel: &CancellationToken,
    ) -> Result<Summary, PipelineError> {
        let mut run = Run::new(self, cancel);
        let title = request.title();

        let overview_text = run.call(Stage::Overview, request.seed_prompt()).await?;
        if overview_text.trim().is_empty() {
            run.warn(Stage::Overview, None, "model returned an empty overview");
        }
        let context = truncate_chars(&overview_text, self.config.overview_context_chars);

        let mut lists: [Vec<String>; 4] = Default::default();
        for (section, slot) in SummarySection::ALL.into_iter().zip(lists.iter_mut()) {
            let stage = section.stage();
            let reply = run
                .call(stage, &prompts::summary_prompt(section, title, context))
                .await?;
            *slot = extract_list(&reply);
            if slot.is_empty() {
                run.warn(stage, None, "no list items found in model reply");
            }
        }
        let [key_themes, insights, takeaways, evidence] = lists;

        tracing::info!(
            title = %title,
            key_themes = key_themes.len(),
            insights = insights.len(),
            takeaways = takeaways.len(),
            evidence = evidence.len(),
            model_calls = run.calls,
            "summary assembled"
        );
        Ok(Summary {
            overview_text,
            key_themes,
            insights,
            takeaways,
            evidence,
            warnings: run.warnings,
        })
    }
}

// ---------------------------------------------------------------------------
// Per-request state
// ---------------------------------------------------------------------------

struct Run<'a> {
    assembler: &'a PlanAssembler,
    cancel: &'a CancellationToken,
    calls: usize,
    warnings: Vec<ExtractionWarning>,
}

impl<'a> Run<'a> {
    fn new(assembler: &'a PlanAssembler, cancel: &'a CancellationToken) -> Self {
        Self {
            assembler,
            cancel,
            calls: 0,
            warnings: Vec::new(),
        }
    }

    /// One model call, raced against cancellation.
    async fn call(&mut self, stage: Stage, prompt: &str) -> Result<String, PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled { stage });
        }

        let delay = self.assembler.config.pacing_delay;
        if self.calls > 0 && !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled { stage }),
            }
        }
        self.calls += 1;

        tracing::debug!(stage = %stage, prompt_chars = prompt.len(), "calling model");
        let result = tokio::select! {
            result = self.assembler.client.generate(prompt) => result,
            _ = self.cancel.cancelled() => {
                tracing::info!(stage = %stage, "pipeline cancelled");
                return Err(PipelineError::Cancelled { stage });
            }
        };

        match result {
            Ok(reply) => {
                tracing::debug!(stage = %stage, reply_chars = reply.len(), "model replied");
                Ok(reply)
            }
            Err(err) => {
                tracing::warn!(stage = %stage, error = %err, "model call failed");
                Err(PipelineError::from_model(stage, err))
            }
        }
    }

    fn warn(&mut self, stage: Stage, phase: Option<&str>, message: &str) {
        tracing::warn!(stage = %stage, phase = ?phase, "{message}");
        self.warnings.push(ExtractionWarning {
            stage,
            phase: phase.map(str::to_string),
            message: message.to_string(),
        });
    }
}
