//! Drawing capability consumed by the exporter.

use thiserror::Error;

use super::layout::{PageGeometry, TableLayout, helvetica_width, layout_table};

/// Errors raised while producing a document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A drawing call was rejected.
    #[error("layout error: {0}")]
    Layout(String),

    /// The PDF backend failed to encode the document.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Writing the finished file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An RGB colour with 0-255 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Self = Self(0, 0, 0);
    pub const WHITE: Self = Self(255, 255, 255);

    /// Channels scaled to `0.0..=1.0`.
    pub fn unit(self) -> [f32; 3] {
        [self.0, self.1, self.2].map(|c| f32::from(c) / 255.0)
    }
}

/// A table to draw.
#[derive(Debug, Clone)]
pub struct TableSpec<'a> {
    /// Top edge of the table region.
    pub start_y: f32,
    pub headers: &'a [String],
    pub rows: &'a [Vec<String>],
    pub font_size: f32,
    pub header_fill: Rgb,
    pub header_text: Rgb,
    pub body_text: Rgb,
}

/// A paginated drawing surface with a top-left origin, in points.
///
/// Text is positioned by its baseline. `table` performs its own layout and
/// reports the bottom edge of the region it occupied so that subsequent
/// content can follow without overlapping.
pub trait Document {
    /// Geometry of every page.
    fn geometry(&self) -> PageGeometry;

    /// Start a new page and make it current.
    fn add_page(&mut self);

    fn set_font_size(&mut self, size: f32);

    fn set_bold(&mut self, bold: bool);

    /// Colour used by subsequent text.
    fn set_text_color(&mut self, color: Rgb);

    /// Width of `text` in the current font.
    fn text_width(&self, text: &str) -> f32;

    /// Draw one line of text with its baseline at `y`.
    fn text(&mut self, text: &str, x: f32, y: f32) -> Result<(), ExportError>;

    /// Draw a table, returning the y of its bottom edge on the current page.
    fn table(&mut self, spec: &TableSpec<'_>) -> Result<f32, ExportError>;

    /// Finish the document and return its bytes.
    fn save(&mut self) -> Result<Vec<u8>, ExportError>;
}

/// Reject coordinates that fall outside the page.
pub(crate) fn check_position(page: PageGeometry, x: f32, y: f32) -> Result<(), ExportError> {
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 || x > page.width || y > page.height {
        return Err(ExportError::Layout(format!(
            "position ({x}, {y}) is outside the {}x{} page",
            page.width, page.height
        )));
    }
    Ok(())
}

/// Lay out `spec` on `page`, rejecting tables without columns.
pub(crate) fn plan_table(
    spec: &TableSpec<'_>,
    page: PageGeometry,
    measure: impl Fn(&str) -> f32,
) -> Result<TableLayout, ExportError> {
    if spec.headers.is_empty() {
        return Err(ExportError::Layout("table has no columns".into()));
    }
    check_position(page, page.margin, spec.start_y)?;
    Ok(layout_table(
        spec.headers,
        spec.rows,
        spec.start_y,
        spec.font_size,
        page,
        measure,
    ))
}

/// A drawing call captured by [`RecordingDocument`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        text: String,
        x: f32,
        y: f32,
        font_size: f32,
        bold: bool,
        color: Rgb,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        header_fill: Rgb,
        start_y: f32,
        end_y: f32,
    },
    AddPage,
}

/// [`Document`] that records drawing calls instead of producing a file.
///
/// Uses the same table layout as the PDF backend, so reported positions match.
#[derive(Debug)]
pub struct RecordingDocument {
    geometry: PageGeometry,
    font_size: f32,
    bold: bool,
    color: Rgb,
    pages: usize,
    ops: Vec<DrawOp>,
}

impl Default for RecordingDocument {
    fn default() -> Self {
        Self::new(PageGeometry::A4)
    }
}

impl RecordingDocument {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            font_size: 12.0,
            bold: false,
            color: Rgb::BLACK,
            pages: 1,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Text drawn, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Document for RecordingDocument {
    fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    fn add_page(&mut self) {
        self.pages += 1;
        self.ops.push(DrawOp::AddPage);
    }

    fn set_font_size(&mut self, size: f32) {
        self.font_size = size;
    }

    fn set_bold(&mut self, bold: bool) {
        self.bold = bold;
    }

    fn set_text_color(&mut self, color: Rgb) {
        self.color = color;
    }

    fn text_width(&self, text: &str) -> f32 {
        helvetica_width(text, self.font_size)
    }

    fn text(&mut self, text: &str, x: f32, y: f32) -> Result<(), ExportError> {
        check_position(self.geometry, x, y)?;
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            font_size: self.font_size,
            bold: self.bold,
            color: self.color,
        });
        Ok(())
    }

    fn table(&mut self, spec: &TableSpec<'_>) -> Result<f32, ExportError> {
        let font_size = spec.font_size;
        let layout = plan_table(spec, self.geometry, |s| helvetica_width(s, font_size))?;
        self.pages += layout.extra_pages;
        self.ops.push(DrawOp::Table {
            headers: spec.headers.to_vec(),
            rows: spec.rows.to_vec(),
            header_fill: spec.header_fill,
            start_y: spec.start_y,
            end_y: layout.end_y,
        });
        Ok(layout.end_y)
    }

    fn save(&mut self) -> Result<Vec<u8>, ExportError> {
        Ok(format!("{:?}", self.ops).into_bytes())
    }
}
