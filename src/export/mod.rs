//! PDF export of wage tables.
//!
//! The exporter's layout algorithm only talks to the [`Document`] trait, so
//! the same report can be drawn into a real PDF ([`PdfDocument`]) or captured
//! for inspection ([`RecordingDocument`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use tara_chat::chat::TablePayload;
//! use tara_chat::export::PdfExporter;
//!
//! let table = TablePayload::from_grid(vec![
//!     vec!["Category".into(), "Rate".into()],
//!     vec!["Skilled".into(), "21215".into()],
//! ])
//! .unwrap();
//!
//! let path = PdfExporter::new("exports").export(&table, None).unwrap();
//! println!("saved {}", path.display());
//! ```

mod document;
mod exporter;
mod layout;
mod pdf;

pub use document::{DrawOp, Document, ExportError, RecordingDocument, Rgb, TableSpec};
pub use exporter::{
    DISCLAIMER, ExportedPdf, FALLBACK_FILENAME, ORGANIZATION_TITLE, PdfExporter, REPORT_TITLE,
    report_filename,
};
pub use layout::{PageGeometry, helvetica_width, wrap_text};
pub use pdf::PdfDocument;
