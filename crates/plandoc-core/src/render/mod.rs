//! Document rendering.
//!
//! A [`Plan`] or [`Summary`] is first laid out into a format-agnostic
//! [`DocumentModel`] (see [`layout`]), then encoded by a [`DocumentBackend`]
//! and written atomically into the output directory by [`DocumentRenderer`].

pub mod layout;
pub mod pdf;
pub mod text;
mod wrap;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

use crate::plan::{Plan, Summary};

pub use layout::{LayoutOptions, neutralize, plan_document, summary_document};
pub use pdf::{PdfBackend, PdfStyle};
pub use text::TextBackend;

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Section,
    Subsection,
}

/// One layout element. Text is plain; backends never interpret markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Subtitle(String),
    Heading { level: HeadingLevel, text: String },
    Paragraph(String),
    /// Short bold line introducing a group of bullets.
    Label(String),
    Bullet { depth: u8, text: String },
    /// Placeholder for an empty section.
    Note(String),
    /// Start the next block on a fresh page.
    SectionBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentModel {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl DocumentModel {
    pub fn section_breaks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::SectionBreak))
            .count()
    }

    pub fn headings(&self, level: HeadingLevel) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(move |b| match b {
            Block::Heading { level: l, text } if *l == level => Some(text.as_str()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain; charset=utf-8",
        }
    }

    /// Backend with default styling.
    pub fn backend(self) -> Arc<dyn DocumentBackend> {
        match self {
            Self::Pdf => Arc::new(PdfBackend::default()),
            Self::Text => Arc::new(TextBackend::default()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "text" | "txt" => Ok(Self::Text),
            other => Err(format!("unknown output format `{other}` (expected pdf or text)")),
        }
    }
}

/// Encodes a [`DocumentModel`] into file bytes. Identical input must give
/// identical bytes.
pub trait DocumentBackend: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn render(&self, document: &DocumentModel) -> Result<Vec<u8>, RenderError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn DocumentBackend) {}
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode {format} document: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },

    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking render task panicked or was aborted.
    #[error("render task failed: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// A document written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub path: PathBuf,
    /// Suggested client-side file name.
    pub download_name: String,
    pub media_type: &'static str,
    pub format: OutputFormat,
    pub size_bytes: usize,
}

/// Lays out, encodes and persists documents. Safe to share across
/// concurrent requests: every call writes a fresh uniquely named file.
#[derive(Clone)]
pub struct DocumentRenderer {
    output_dir: PathBuf,
    backend: Arc<dyn DocumentBackend>,
    layout: LayoutOptions,
}

impl DocumentRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            output_dir: output_dir.into(),
            backend,
            layout: LayoutOptions::default(),
        }
    }

    pub fn for_format(output_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self::new(output_dir, format.backend())
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Same output directory and layout, different backend.
    pub fn with_format(&self, format: OutputFormat) -> Self {
        if format == self.backend.format() {
            return self.clone();
        }
        Self {
            output_dir: self.output_dir.clone(),
            backend: format.backend(),
            layout: self.layout.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn format(&self) -> OutputFormat {
        self.backend.format()
    }

    pub fn render_plan(&self, plan: &Plan, title: &str) -> Result<RenderedDocument, RenderError> {
        let document = plan_document(plan, title, &self.layout);
        self.render_document(&document)
    }

    pub fn render_summary(
        &self,
        summary: &Summary,
        title: &str,
    ) -> Result<RenderedDocument, RenderError> {
        let document = summary_document(summary, title, &self.layout);
        self.render_document(&document)
    }

    /// Encode and persist. The file appears under its final name only once
    /// fully written.
    pub fn render_document(&self, document: &DocumentModel) -> Result<RenderedDocument, RenderError> {
        let format = self.backend.format();
        let bytes = self.backend.render(document)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let file_name = format!(
            "{}_{}.{}",
            file_stem(&document.title),
            Uuid::new_v4().simple(),
            format.extension()
        );
        let path = self.output_dir.join(file_name);
        let write_err = |source| RenderError::Write {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.output_dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        tracing::info!(
            path = %path.display(),
            format = %format,
            size_bytes = bytes.len(),
            "document written"
        );
        Ok(RenderedDocument {
            download_name: download_name(&document.title, format),
            path,
            media_type: format.media_type(),
            format,
            size_bytes: bytes.len(),
        })
    }
}

const MAX_STEM_CHARS: usize = 80;

/// File-system safe stem: ASCII alphanumerics, `-` and `_` only.
fn file_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            stem.push(c);
        } else if c.is_whitespace() && !stem.ends_with('_') {
            stem.push('_');
        }
        if stem.len() >= MAX_STEM_CHARS {
            break;
        }
    }
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}

/// The title with spaces replaced by underscores. Path separators, quotes
/// and control characters are dropped.
pub fn download_name(title: &str, format: OutputFormat) -> String {
    let name: String = title
        .trim()
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | '"'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    let name = if name.is_empty() { "document" } else { &name };
    format!("{name}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str) -> DocumentModel {
        DocumentModel {
            title: title.to_string(),
            blocks: vec![
                Block::Title(title.to_string()),
                Block::Paragraph("Body".to_string()),
            ],
        }
    }

    #[test]
    fn output_format_parses_and_names() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("docx".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.extension(), "txt");
        assert_eq!(OutputFormat::Pdf.media_type(), "application/pdf");
        assert_eq!(
            serde_json::to_string(&OutputFormat::Text).unwrap(),
            "\"text\""
        );
    }

    #[test]
    fn file_stem_is_filesystem_safe() {
        assert_eq!(file_stem("Lunar mining"), "Lunar_mining");
        assert_eq!(file_stem("../../etc/passwd"), "etcpasswd");
        assert_eq!(file_stem("  a   b  "), "a_b");
        assert_eq!(file_stem("???"), "document");
        assert!(file_stem(&"x".repeat(500)).len() <= MAX_STEM_CHARS);
    }

    #[test]
    fn download_name_replaces_spaces() {
        assert_eq!(
            download_name("Lunar mining plan", OutputFormat::Pdf),
            "Lunar_mining_plan.pdf"
        );
        assert_eq!(
            download_name("a/b \"c\"", OutputFormat::Text),
            "ab_c.txt"
        );
        assert_eq!(download_name("", OutputFormat::Pdf), "document.pdf");
    }

    #[test]
    fn render_document_writes_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let renderer = DocumentRenderer::for_format(&out, OutputFormat::Text);

        let a = renderer.render_document(&doc("Same title")).unwrap();
        let b = renderer.render_document(&doc("Same title")).unwrap();

        assert_ne!(a.path, b.path);
        assert_eq!(a.download_name, "Same_title.txt");
        assert_eq!(a.media_type, "text/plain; charset=utf-8");
        assert_eq!(std::fs::read(&a.path).unwrap(), std::fs::read(&b.path).unwrap());
        assert_eq!(a.size_bytes, std::fs::metadata(&a.path).unwrap().len() as usize);

        let names: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2, "no temp files left behind: {names:?}");
        assert!(names.iter().all(|n| n.starts_with("Same_title_") && n.ends_with(".txt")));
    }

    #[test]
    fn with_format_swaps_backend() {
        let renderer = DocumentRenderer::for_format("out", OutputFormat::Pdf);
        assert_eq!(renderer.format(), OutputFormat::Pdf);
        let text = renderer.with_format(OutputFormat::Text);
        assert_eq!(text.format(), OutputFormat::Text);
        assert_eq!(text.output_dir(), Path::new("out"));
    }

    #[test]
    fn model_counts_breaks_and_headings() {
        let model = DocumentModel {
            title: "t".into(),
            blocks: vec![
                Block::Heading {
                    level: HeadingLevel::Section,
                    text: "A".into(),
                },
                Block::SectionBreak,
                Block::Heading {
                    level: HeadingLevel::Subsection,
                    text: "B".into(),
                },
            ],
        };
        assert_eq!(model.section_breaks(), 1);
        assert_eq!(model.headings(HeadingLevel::Section).collect::<Vec<_>>(), vec!["A"]);
    }
}
