//! `plandoc generate` and `plandoc summarize`: run one pipeline to completion
//! and print where the document landed.

use anyhow::Result;

use plandoc_core::plan::ExtractionWarning;
use plandoc_core::{GenerationRequest, RenderedDocument, SummaryRequest};

use crate::context::{AppContext, RenderOptions};

pub async fn run_generate(
    ctx: &AppContext,
    title: &str,
    objective: &str,
    prompt: &str,
) -> Result<()> {
    let request = GenerationRequest::new(title, objective, prompt)?;
    let generated = ctx
        .generate_plan(&request, RenderOptions::default())
        .await?;
    let plan = &generated.content;

    print_document(&generated.document);
    if plan.phases.len() < plan.phases_found {
        println!(
            "  phases:    {} of {} (limited)",
            plan.phases.len(),
            plan.phases_found
        );
    } else {
        println!("  phases:    {}", plan.phases.len());
    }
    println!("  objectives: {}", plan.objective_count());
    println!("  resources:  {}", plan.resource_item_count());
    print_warnings(&plan.warnings);
    Ok(())
}

pub async fn run_summarize(ctx: &AppContext, title: &str, prompt: &str) -> Result<()> {
    let request = SummaryRequest::new(title, prompt)?;
    let generated = ctx
        .generate_summary(&request, RenderOptions::default())
        .await?;
    let summary = &generated.content;

    print_document(&generated.document);
    println!("  key themes: {}", summary.key_themes.len());
    println!("  insights:   {}", summary.insights.len());
    println!("  takeaways:  {}", summary.takeaways.len());
    println!("  evidence:   {}", summary.evidence.len());
    print_warnings(&summary.warnings);
    Ok(())
}

fn print_document(document: &RenderedDocument) {
    println!("Wrote {} ({} bytes)", document.path.display(), document.size_bytes);
}

fn print_warnings(warnings: &[ExtractionWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("Warnings:");
    for w in warnings {
        match &w.phase {
            Some(phase) => println!("  [{}] {phase}: {}", w.stage, w.message),
            None => println!("  [{}] {}", w.stage, w.message),
        }
    }
}
