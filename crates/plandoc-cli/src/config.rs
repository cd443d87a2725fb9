//! Configuration file management for plandoc.
//!
//! Provides a TOML-based config file at `~/.config/plandoc/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use plandoc_core::model::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use plandoc_core::{AssemblerConfig, ModelConfig, OutputFormat, PhaseLimit, RateLimits};

pub const ENV_API_KEY: &str = "PLANDOC_API_KEY";
pub const ENV_MODEL: &str = "PLANDOC_MODEL";
pub const ENV_OUTPUT_DIR: &str = "PLANDOC_OUTPUT_DIR";
pub const ENV_ALLOWED_ORIGINS: &str = "PLANDOC_ALLOWED_ORIGINS";

pub const DEFAULT_OUTPUT_DIR: &str = "pdfs";
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

/// Every section and key is optional; missing values fall back to defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub model: ModelSection,
    pub pipeline: PipelineSection,
    pub server: ServerSection,
    pub output: OutputSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub requests_per_minute: Option<u32>,
    pub tokens_per_minute: Option<u32>,
    pub burst: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub overview_context_chars: Option<usize>,
    /// Process at most this many phases (0 or absent means all).
    pub max_phases: Option<usize>,
    pub pacing_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// `["*"]` allows any origin; empty disables CORS headers.
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the plandoc config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/plandoc` or `~/.config/plandoc`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("plandoc");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("plandoc")
}

/// Return the path to the plandoc config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config file")
}

/// Load and parse the config file. `Ok(None)` when it does not exist.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("invalid config file at {}", path.display()))
        .map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file is owner-only (0600 on Unix) from the moment it exists, since it
/// may hold the API key.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    write_private(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(path)
}

fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; an existing file keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

/// Skeleton written by `plandoc init`: every default spelled out, no key.
pub fn skeleton(api_key: Option<String>) -> ConfigFile {
    let limits = RateLimits::default();
    let assembler = AssemblerConfig::default();
    ConfigFile {
        model: ModelSection {
            name: Some(DEFAULT_MODEL.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            api_key,
            timeout_secs: Some(120),
            requests_per_minute: Some(limits.requests_per_minute),
            tokens_per_minute: Some(limits.tokens_per_minute),
            burst: Some(limits.burst),
        },
        pipeline: PipelineSection {
            overview_context_chars: Some(assembler.overview_context_chars),
            max_phases: Some(0),
            pacing_delay_ms: Some(0),
        },
        server: ServerSection {
            bind: Some(DEFAULT_BIND.to_string()),
            port: Some(DEFAULT_PORT),
            allowed_origins: Some(Vec::new()),
        },
        output: OutputSection {
            dir: Some(PathBuf::from(DEFAULT_OUTPUT_DIR)),
            format: Some(OutputFormat::Pdf),
        },
    }
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line; `None` defers to env, file, default.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub model: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub max_phases: Option<usize>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PlandocConfig {
    pub model: ModelConfig,
    pub assembler: AssemblerConfig,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    pub bind: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl PlandocConfig {
    /// Resolve configuration from the config file on disk.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file = load_config()?.unwrap_or_default();
        Self::resolve_with(overrides, file)
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - API key: `PLANDOC_API_KEY` env > `model.api_key` > error
    /// - Model: `--model` > `PLANDOC_MODEL` env > `model.name` > `DEFAULT_MODEL`
    /// - Output dir: `--output-dir` > `PLANDOC_OUTPUT_DIR` env > `output.dir` > `pdfs`
    /// - Allowed origins: `PLANDOC_ALLOWED_ORIGINS` (comma-separated) > `server.allowed_origins` > none
    pub fn resolve_with(overrides: &Overrides, file: ConfigFile) -> Result<Self> {
        let ConfigFile {
            model: m,
            pipeline: p,
            server: s,
            output: o,
        } = file;

        let Some(api_key) = env_var(ENV_API_KEY).or(m.api_key.filter(|k| !k.trim().is_empty()))
        else {
            bail!(
                "model API key not found; set {ENV_API_KEY} or add model.api_key to {}",
                config_path().display()
            );
        };

        let model_name = overrides
            .model
            .clone()
            .or_else(|| env_var(ENV_MODEL))
            .or(m.name)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let defaults = RateLimits::default();
        let limits = RateLimits {
            requests_per_minute: m.requests_per_minute.unwrap_or(defaults.requests_per_minute),
            tokens_per_minute: m.tokens_per_minute.unwrap_or(defaults.tokens_per_minute),
            burst: m.burst.unwrap_or(defaults.burst).max(1),
        };

        let mut model = ModelConfig::new(api_key)
            .with_model(model_name)
            .with_limits(limits);
        if let Some(base_url) = m.base_url {
            model = model.with_base_url(base_url);
        }
        if let Some(secs) = m.timeout_secs {
            if secs == 0 {
                bail!("model.timeout_secs must be greater than zero");
            }
            model = model.with_timeout(Duration::from_secs(secs));
        }

        let assembler_defaults = AssemblerConfig::default();
        let assembler = AssemblerConfig {
            overview_context_chars: p
                .overview_context_chars
                .unwrap_or(assembler_defaults.overview_context_chars),
            phase_limit: PhaseLimit::from_max(overrides.max_phases.or(p.max_phases)),
            pacing_delay: p
                .pacing_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(assembler_defaults.pacing_delay),
        };

        let output_dir = overrides
            .output_dir
            .clone()
            .or_else(|| env_var(ENV_OUTPUT_DIR).map(PathBuf::from))
            .or(o.dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let allowed_origins = match env_var(ENV_ALLOWED_ORIGINS) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => s.allowed_origins.unwrap_or_default(),
        };

        Ok(Self {
            model,
            assembler,
            output_dir,
            output_format: overrides.format.or(o.format).unwrap_or_default(),
            bind: overrides
                .bind
                .clone()
                .or(s.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: overrides.port.or(s.port).unwrap_or(DEFAULT_PORT),
            allowed_origins,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
