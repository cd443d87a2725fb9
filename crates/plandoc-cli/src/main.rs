mod config;
mod context;
mod generate_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use plandoc_core::{GeminiClient, ModelClient, OutputFormat};

use config::{Overrides, PlandocConfig};
use context::AppContext;

#[derive(Parser)]
#[command(
    name = "plandoc",
    about = "Turn a strategic prompt into a phase-by-phase plan document"
)]
struct Cli {
    /// Model name (overrides PLANDOC_MODEL env var)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a plandoc config file with every default spelled out
    Init {
        /// Store this API key in the config file (PLANDOC_API_KEY is preferred)
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP service
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate a plan document
    Generate {
        /// Document title
        #[arg(long)]
        title: String,
        /// What the plan should achieve
        #[arg(long)]
        objective: String,
        /// Strategic prompt that seeds the overview
        #[arg(long)]
        prompt: String,
        /// Output format: pdf or text
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Only expand the first N phases (0 = all)
        #[arg(long)]
        max_phases: Option<usize>,
        /// Directory for the rendered document
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Generate a summary report
    Summarize {
        /// Document title
        #[arg(long)]
        title: String,
        /// Strategic prompt that seeds the overview
        #[arg(long)]
        prompt: String,
        /// Output format: pdf or text
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Directory for the rendered document
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn cmd_init(api_key: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let path = config::save_config(&config::skeleton(api_key))?;

    println!("Config written to {}", path.display());
    if has_key {
        println!("  model.api_key = <set>");
    } else {
        println!();
        println!(
            "Next: export {} or add model.api_key to the file.",
            config::ENV_API_KEY
        );
    }

    Ok(())
}

/// Resolve config and build the shared context. Fails before any network
/// traffic when the API key is missing.
fn build_context(overrides: &Overrides) -> anyhow::Result<(PlandocConfig, AppContext)> {
    let resolved = PlandocConfig::resolve(overrides)?;
    let client = GeminiClient::new(resolved.model.clone()).context("failed to build model client")?;
    let client: Arc<dyn ModelClient> = Arc::new(client);
    tracing::debug!(model = client.model(), output_dir = %resolved.output_dir.display(), "resolved config");
    let ctx = AppContext::from_config(&resolved, client, CancellationToken::new());
    Ok((resolved, ctx))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { api_key, force } => {
            cmd_init(api_key, force)?;
        }
        Commands::Serve { bind, port } => {
            let overrides = Overrides {
                model: cli.model,
                bind,
                port,
                ..Overrides::default()
            };
            let (resolved, ctx) = build_context(&overrides)?;
            serve_cmd::run_serve(ctx, &resolved.allowed_origins, &resolved.bind, resolved.port)
                .await?;
        }
        Commands::Generate {
            title,
            objective,
            prompt,
            format,
            max_phases,
            output_dir,
        } => {
            let overrides = Overrides {
                model: cli.model,
                output_dir,
                format,
                max_phases,
                ..Overrides::default()
            };
            let (_, ctx) = build_context(&overrides)?;
            generate_cmd::run_generate(&ctx, &title, &objective, &prompt).await?;
        }
        Commands::Summarize {
            title,
            prompt,
            format,
            output_dir,
        } => {
            let overrides = Overrides {
                model: cli.model,
                output_dir,
                format,
                ..Overrides::default()
            };
            let (_, ctx) = build_context(&overrides)?;
            generate_cmd::run_summarize(&ctx, &title, &prompt).await?;
        }
    }

    Ok(())
}
