//! Plain-text backend: UTF-8, wrapped to a fixed column width.

use super::wrap::wrap;
use super::{Block, DocumentBackend, DocumentModel, HeadingLevel, OutputFormat, RenderError};

const FORM_FEED: char = '\u{c}';

#[derive(Debug, Clone)]
pub struct TextBackend {
    width: usize,
}

impl Default for TextBackend {
    fn default() -> Self {
        Self { width: 78 }
    }
}

impl TextBackend {
    pub fn with_width(width: usize) -> Self {
        Self {
            width: width.max(20),
        }
    }

    fn push_wrapped(&self, out: &mut String, first: &str, rest: &str, text: &str) {
        let avail = self.width.saturating_sub(first.chars().count()).max(1);
        for (i, line) in wrap(text, avail as f32, |s| s.chars().count() as f32)
            .into_iter()
            .enumerate()
        {
            out.push_str(if i == 0 { first } else { rest });
            out.push_str(&line);
            out.push('\n');
        }
    }

    fn push_underlined(&self, out: &mut String, text: &str, rule: char) {
        let start = out.len();
        self.push_wrapped(out, "", "", text);
        let longest = out[start..]
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        out.extend(std::iter::repeat_n(rule, longest));
        out.push('\n');
    }
}

impl DocumentBackend for TextBackend {
    fn format(&self) -> OutputFormat {
        OutputFormat::Text
    }

    fn render(&self, document: &DocumentModel) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        for block in &document.blocks {
            match block {
                Block::Title(text) => {
                    self.push_underlined(&mut out, text, '=');
                }
                Block::Subtitle(text) => {
                    self.push_wrapped(&mut out, "", "", text);
                    out.push('\n');
                }
                Block::Heading { level, text } => {
                    if !out.is_empty() && !out.ends_with(FORM_FEED) {
                        out.push('\n');
                    }
                    let rule = match level {
                        HeadingLevel::Section => '-',
                        HeadingLevel::Subsection => '~',
                    };
                    self.push_underlined(&mut out, text, rule);
                }
                Block::Paragraph(text) => {
                    self.push_wrapped(&mut out, "", "", text);
                    out.push('\n');
                }
                Block::Label(text) => {
                    self.push_wrapped(&mut out, "", "", text);
                }
                Block::Bullet { depth, text } => {
                    let indent = "  ".repeat(usize::from(*depth));
                    let first = format!("{indent}- ");
                    let rest = format!("{indent}  ");
                    self.push_wrapped(&mut out, &first, &rest, text);
                }
                Block::Note(text) => {
                    self.push_wrapped(&mut out, "(", " ", &format!("{text})"));
                }
                Block::SectionBreak => {
                    out.push(FORM_FEED);
                }
            }
        }
        Ok(out.into_bytes())
    }
}
