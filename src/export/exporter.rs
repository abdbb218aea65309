//! Minimum-wage report layout.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::chat::response::{Meta, TablePayload};

use super::document::{Document, ExportError, Rgb, TableSpec};
use super::layout::{LINE_SPACING, wrap_text};
use super::pdf::PdfDocument;

/// First line of every report.
pub const ORGANIZATION_TITLE: &str = "SLCI - Labour Law & Compliance Services";
/// Second line of every report.
pub const REPORT_TITLE: &str = "Minimum Wages Report";
/// Closing paragraph under the table.
pub const DISCLAIMER: &str = "Disclaimer: This data is fetched automatically from publicly \
available government sources and is provided for reference only. Please verify all rates \
against the official government notification before relying on them.";
/// Filename used when no state is known.
pub const FALLBACK_FILENAME: &str = "Minimum_Wages_Report.pdf";

/// Vertical distance between consecutive text lines above the table.
pub const LINE_HEIGHT: f32 = 18.0;
/// Gap between the table region and the disclaimer.
pub const DISCLAIMER_MARGIN: f32 = 20.0;
/// Maximum disclaimer line width.
pub const DISCLAIMER_WIDTH: f32 = 480.0;

const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;
const TABLE_SIZE: f32 = 9.0;
const DISCLAIMER_SIZE: f32 = 9.0;

pub const TEXT_COLOR: Rgb = Rgb::BLACK;
pub const LINK_COLOR: Rgb = Rgb(0, 0, 238);
pub const HEADER_FILL: Rgb = Rgb(41, 128, 185);
pub const WARNING_COLOR: Rgb = Rgb(192, 57, 43);

/// Output filename for a report, derived from the state name when present.
pub fn report_filename(meta: Option<&Meta>) -> String {
    let state = meta
        .map(|m| {
            m.state
                .split(|c: char| !c.is_alphanumeric())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("_")
        })
        .filter(|state| !state.is_empty());

    match state {
        Some(state) => format!("Minimum_Wages_{state}.pdf"),
        None => FALLBACK_FILENAME.to_string(),
    }
}

/// A finished report held in memory.
#[derive(Debug, Clone)]
pub struct ExportedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Lays out wage tables as PDF reports and writes them to disk.
#[derive(Debug, Clone)]
pub struct PdfExporter {
    output_dir: PathBuf,
}

impl PdfExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Draw the report onto `doc`.
    ///
    /// Sections, top to bottom: titles, optional metadata block, table,
    /// disclaimer. Returns on the first failed drawing call.
    pub fn layout<D: Document>(
        &self,
        doc: &mut D,
        table: &TablePayload,
        meta: Option<&Meta>,
    ) -> Result<(), ExportError> {
        let page = doc.geometry();
        let x = page.margin;
        let mut y = page.margin;

        doc.set_text_color(TEXT_COLOR);
        doc.set_bold(true);
        doc.set_font_size(TITLE_SIZE);
        doc.text(ORGANIZATION_TITLE, x, y)?;
        y += LINE_HEIGHT;

        doc.set_font_size(SUBTITLE_SIZE);
        doc.text(REPORT_TITLE, x, y)?;
        y += LINE_HEIGHT;

        doc.set_bold(false);
        doc.set_font_size(BODY_SIZE);
        if let Some(meta) = meta {
            doc.text(&format!("State: {}", meta.state), x, y)?;
            y += LINE_HEIGHT;
            doc.text(&format!("Effective From: {}", meta.effective_from), x, y)?;
            y += LINE_HEIGHT;

            if let Some(url) = meta.pdf_link() {
                doc.set_text_color(LINK_COLOR);
                doc.text(&format!("Notification: {url}"), x, y)?;
                doc.set_text_color(TEXT_COLOR);
                y += LINE_HEIGHT;
            }
        }

        let table_end = doc.table(&TableSpec {
            start_y: y,
            headers: table.headers(),
            rows: table.rows(),
            font_size: TABLE_SIZE,
            header_fill: HEADER_FILL,
            header_text: Rgb::WHITE,
            body_text: TEXT_COLOR,
        })?;

        doc.set_font_size(DISCLAIMER_SIZE);
        doc.set_text_color(WARNING_COLOR);
        let lines = wrap_text(DISCLAIMER, DISCLAIMER_WIDTH, |s| doc.text_width(s));
        let line_height = DISCLAIMER_SIZE * LINE_SPACING;

        let mut y = table_end + DISCLAIMER_MARGIN + DISCLAIMER_SIZE;
        let needed = lines.len() as f32 * line_height;
        if y + needed > page.bottom() {
            doc.add_page();
            y = page.margin + DISCLAIMER_SIZE;
        }
        for line in &lines {
            doc.text(line, x, y)?;
            y += line_height;
        }
        doc.set_text_color(TEXT_COLOR);

        Ok(())
    }

    /// Produce the complete report in memory.
    pub fn render(&self, table: &TablePayload, meta: Option<&Meta>) -> Result<ExportedPdf, ExportError> {
        let mut doc = PdfDocument::default();
        self.layout(&mut doc, table, meta)?;
        Ok(ExportedPdf {
            filename: report_filename(meta),
            bytes: doc.save()?,
        })
    }

    /// Render the report and write it into the output directory.
    ///
    /// The file only appears once the whole document has been produced; a
    /// failure leaves nothing behind.
    pub fn export(&self, table: &TablePayload, meta: Option<&Meta>) -> Result<PathBuf, ExportError> {
        let state = meta.map_or("", |m| m.state.as_str());
        let pdf = self.render(table, meta).inspect_err(|e| {
            error!(name: "export.pdf.failed", state = %state, error = %e, "PDF generation failed");
        })?;

        let path = self.write(&pdf).inspect_err(|e| {
            error!(name: "export.pdf.write_failed", state = %state, error = %e, "Failed to save PDF");
        })?;

        info!(
            name: "export.pdf.saved",
            path = %path.display(),
            bytes = pdf.bytes.len(),
            "PDF report saved"
        );
        Ok(path)
    }

    fn write(&self, pdf: &ExportedPdf) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(&pdf.filename);
        let partial = self.output_dir.join(format!(".{}.partial", pdf.filename));
        std::fs::write(&partial, &pdf.bytes)?;
        if let Err(e) = std::fs::rename(&partial, &path) {
            let _ = std::fs::remove_file(&partial);
            return Err(e.into());
        }
        Ok(path)
    }
}
