//! Table card rendering.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::chat::response::{Meta, TablePayload};
use crate::export::PdfExporter;

use super::target::{RenderTarget, RenderedNode};

/// Alert shown when a report cannot be generated.
pub const EXPORT_FAILED_ALERT: &str = "Sorry, the PDF could not be generated. Please try again.";

/// The "download PDF" action attached to a table card.
///
/// Holds the exact payload the card was rendered from.
#[derive(Debug, Clone)]
pub struct ExportAction {
    table: Arc<TablePayload>,
    meta: Option<Arc<Meta>>,
}

impl ExportAction {
    pub fn table(&self) -> &TablePayload {
        &self.table
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_deref()
    }

    /// Run the export. On failure the error is logged by the exporter and a
    /// single alert is raised on `target`.
    pub fn trigger(&self, exporter: &PdfExporter, target: &mut dyn RenderTarget) -> Option<PathBuf> {
        match exporter.export(&self.table, self.meta()) {
            Ok(path) => Some(path),
            Err(_) => {
                target.alert(EXPORT_FAILED_ALERT);
                None
            }
        }
    }
}

/// A rendered table: meta summary, HTML table and export action.
#[derive(Debug, Clone)]
pub struct TableCard {
    pub html: String,
    pub export: ExportAction,
}

impl TableCard {
    pub fn table(&self) -> &TablePayload {
        self.export.table()
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.export.meta()
    }
}

/// Turns table replies into cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRenderer;

impl TableRenderer {
    /// Build the card without displaying it.
    pub fn card(&self, table: Arc<TablePayload>, meta: Option<Arc<Meta>>) -> TableCard {
        let mut html = String::from(r#"<div class="table-card">"#);

        if let Some(meta) = meta.as_deref() {
            html.push_str(&meta_block(meta));
        }
        html.push_str(&table_html(&table));
        html.push_str(r#"<button type="button" class="export-pdf">Download PDF</button></div>"#);

        TableCard {
            html,
            export: ExportAction { table, meta },
        }
    }

    /// Append a card for `table` to the target.
    pub fn render(
        &self,
        target: &mut dyn RenderTarget,
        table: Arc<TablePayload>,
        meta: Option<Arc<Meta>>,
    ) {
        target.remove_transient();
        target.append(RenderedNode::Table(self.card(table, meta)));
        target.scroll_to_end();
    }
}

fn meta_block(meta: &Meta) -> String {
    let mut html = String::from(r#"<div class="table-meta">"#);
    for (label, value) in [
        ("State", &meta.state),
        ("Act", &meta.act_name),
        ("DA", &meta.da),
        ("Effective From", &meta.effective_from),
    ] {
        let _ = write!(html, "<p><strong>{label}:</strong> {}</p>", encode_text(value));
    }
    if let Some(url) = meta.pdf_link() {
        let _ = write!(
            html,
            r#"<a class="notification-link" href="{}" target="_blank" rel="noopener">View Notification</a>"#,
            encode_double_quoted_attribute(url)
        );
    }
    html.push_str("</div>");
    html
}

fn table_html(table: &TablePayload) -> String {
    let mut html = String::from(r#"<div class="table-scroll"><table class="wage-table"><thead><tr>"#);
    for header in table.headers() {
        let _ = write!(html, "<th>{}</th>", encode_text(header));
    }
    html.push_str("</tr></thead><tbody>");
    for row in table.rows() {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", encode_text(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
    html
}
