//! Report Markdown Assembly

use crate::flow::{ChapterDigest, FlowMeta};
use crate::synthesis::FlowSummary;
use std::fmt::Write;

/// Everything that goes into one report
#[derive(Debug, Clone, Copy)]
pub struct ReportDocument<'a> {
    pub summary: &'a FlowSummary,
    /// Relative reference to the social image; omitted when there is none
    pub image_path: Option<&'a str>,
    /// Flow metadata for the "Flow details" section
    pub meta: Option<&'a FlowMeta>,
    /// Chapters for the "Chapters" section
    pub chapters: &'a [ChapterDigest],
}

impl<'a> ReportDocument<'a> {
    pub fn new(summary: &'a FlowSummary) -> Self {
        Self {
            summary,
            image_path: None,
            meta: None,
            chapters: &[],
        }
    }
}

/// Markdown builder for flow reports
pub struct ReportRenderer {
    /// Buffer for building markdown
    buffer: String,
}

impl ReportRenderer {
    /// Create a new report renderer
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(4096),
        }
    }

    /// Render the core report: heading, image, narrative and step list
    pub fn render(&mut self, summary: &FlowSummary, image_path: &str) -> String {
        let mut document = ReportDocument::new(summary);
        document.image_path = Some(image_path);
        self.build(&document)
    }

    /// Render a full report
    pub fn build(&mut self, document: &ReportDocument<'_>) -> String {
        self.buffer.clear();

        // Writing to a String never fails
        let _ = self.write_document(document);

        std::mem::take(&mut self.buffer)
    }

    fn write_document(&mut self, document: &ReportDocument<'_>) -> std::fmt::Result {
        let summary = document.summary;
        let title = single_line(&summary.title);

        writeln!(self.buffer, "# {}", title)?;
        writeln!(self.buffer)?;

        if let Some(path) = document.image_path {
            writeln!(self.buffer, "![{}]({})", escape_alt(&title), link_target(path))?;
            writeln!(self.buffer)?;
        }

        if !summary.overall_narrative.trim().is_empty() {
            writeln!(self.buffer, "{}", summary.overall_narrative.trim())?;
            writeln!(self.buffer)?;
        }

        self.write_steps(&summary.step_descriptions)?;

        if !document.chapters.is_empty() {
            self.write_chapters(document.chapters)?;
        }

        if let Some(meta) = document.meta.filter(|m| !m.is_empty()) {
            self.write_details(meta)?;
        }

        Ok(())
    }

    /// Write the ordered step list
    fn write_steps(&mut self, steps: &[String]) -> std::fmt::Result {
        writeln!(self.buffer, "## Steps")?;
        writeln!(self.buffer)?;

        for (i, step) in steps.iter().enumerate() {
            writeln!(self.buffer, "{}. {}", i + 1, single_line(step))?;
        }

        writeln!(self.buffer)?;
        Ok(())
    }

    fn write_chapters(&mut self, chapters: &[ChapterDigest]) -> std::fmt::Result {
        writeln!(self.buffer, "## Chapters")?;
        writeln!(self.buffer)?;

        for chapter in chapters {
            let title = chapter
                .title
                .as_deref()
                .map(single_line)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled chapter".to_string());
            write!(self.buffer, "- **{}**", title)?;

            if let Some(subtitle) = chapter.subtitle.as_deref().map(single_line) {
                if !subtitle.is_empty() {
                    write!(self.buffer, ": {}", subtitle)?;
                }
            }
            writeln!(self.buffer)?;
        }

        writeln!(self.buffer)?;
        Ok(())
    }

    fn write_details(&mut self, meta: &FlowMeta) -> std::fmt::Result {
        writeln!(self.buffer, "## Flow details")?;
        writeln!(self.buffer)?;

        let rows = [
            ("Name", &meta.name),
            ("Use case", &meta.use_case),
            ("Description", &meta.description),
            ("Status", &meta.status),
            ("Created", &meta.created),
            ("Schema version", &meta.schema_version),
        ];
        for (label, value) in rows {
            if let Some(value) = value.as_deref().map(single_line) {
                if !value.is_empty() {
                    writeln!(self.buffer, "- **{}:** {}", label, value)?;
                }
            }
        }

        writeln!(self.buffer)?;
        Ok(())
    }
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse internal newlines so a value cannot break list or heading syntax
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_alt(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Paths with spaces or parentheses need angle brackets in a link target
fn link_target(path: &str) -> String {
    if path.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{}>", path)
    } else {
        path.to_string()
    }
}
