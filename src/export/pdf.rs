//! `lopdf`-backed [`Document`].

use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};

use super::document::{Document, ExportError, Rgb, TableSpec, check_position, plan_table};
use super::layout::{CELL_PADDING, LINE_SPACING, PageGeometry, helvetica_width};

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";
const GRID_GRAY: Rgb = Rgb(200, 200, 200);

/// A PDF built page by page from content-stream operations.
///
/// Pages use the standard Helvetica fonts, so text is limited to the
/// WinAnsi character set; see [`to_win_ansi`].
#[derive(Debug)]
pub struct PdfDocument {
    geometry: PageGeometry,
    pages: Vec<Vec<Operation>>,
    current: usize,
    font_size: f32,
    bold: bool,
    color: Rgb,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new(PageGeometry::A4)
    }
}

impl PdfDocument {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Vec::new()],
            current: 0,
            font_size: 12.0,
            bold: false,
            color: Rgb::BLACK,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Convert a top-origin y into PDF user space.
    fn flip(&self, y: f32) -> f32 {
        self.geometry.height - y
    }

    fn ops(&mut self, page: usize) -> &mut Vec<Operation> {
        while self.pages.len() <= page {
            self.pages.push(Vec::new());
        }
        &mut self.pages[page]
    }

    #[allow(clippy::too_many_arguments)]
    fn push_text(&mut self, page: usize, text: &str, x: f32, y: f32, size: f32, bold: bool, color: Rgb) {
        let [r, g, b] = color.unit();
        let font = if bold { BOLD_FONT } else { REGULAR_FONT };
        let baseline = self.flip(y);
        self.ops(page).extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new("Tj", vec![Object::string_literal(to_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn push_rect(&mut self, page: usize, x: f32, top: f32, width: f32, height: f32, fill: Option<Rgb>) {
        let bottom = self.flip(top + height);
        let rect: Vec<Object> = vec![x.into(), bottom.into(), width.into(), height.into()];
        let ops = self.ops(page);
        if let Some(fill) = fill {
            let [r, g, b] = fill.unit();
            ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
            ops.push(Operation::new("re", rect.clone()));
            ops.push(Operation::new("f", vec![]));
        }
        let [r, g, b] = GRID_GRAY.unit();
        ops.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
        ops.push(Operation::new("w", vec![0.5_f32.into()]));
        ops.push(Operation::new("re", rect));
        ops.push(Operation::new("S", vec![]));
    }
}

impl Document for PdfDocument {
    fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    fn add_page(&mut self) {
        self.pages.push(Vec::new());
        self.current = self.pages.len() - 1;
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
        self.push_text(self.current, text, x, y, self.font_size, self.bold, self.color);
        Ok(())
    }

    fn table(&mut self, spec: &TableSpec<'_>) -> Result<f32, ExportError> {
        let font_size = spec.font_size;
        let layout = plan_table(spec, self.geometry, |s| helvetica_width(s, font_size))?;
        let line_height = font_size * LINE_SPACING;
        let start_page = self.current;

        for row in &layout.rows {
            let page = start_page + row.page_offset;
            let fill = row.is_header.then_some(spec.header_fill);
            let color = if row.is_header { spec.header_text } else { spec.body_text };

            let mut x = self.geometry.margin;
            for cell in &row.cells {
                self.push_rect(page, x, row.top, layout.column_width, row.height, fill);
                let mut baseline = row.top + CELL_PADDING + font_size;
                for line in cell {
                    self.push_text(page, line, x + CELL_PADDING, baseline, font_size, row.is_header, color);
                    baseline += line_height;
                }
                x += layout.column_width;
            }
        }

        self.current = start_page + layout.extra_pages;
        Ok(layout.end_y)
    }

    fn save(&mut self) -> Result<Vec<u8>, ExportError> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT => regular_id,
                BOLD_FONT => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in &self.pages {
            let content = Content {
                operations: operations.clone(),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = i64::try_from(kids.len())
            .map_err(|e| ExportError::Layout(format!("too many pages: {e}")))?;
        let media_box: Vec<Object> = vec![
            0_f32.into(),
            0_f32.into(),
            self.geometry.width.into(),
            self.geometry.height.into(),
        ];
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| ExportError::Layout(format!("failed to serialize PDF: {e}")))?;
        Ok(bytes)
    }
}

/// Map text onto the single-byte WinAnsi encoding used by the standard fonts.
///
/// Common typographic characters are folded to ASCII, the rupee sign becomes
/// `Rs.`, other Latin-1 characters pass through and everything else is dropped.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{20b9}' => out.extend_from_slice(b"Rs."),
            '\u{2013}' | '\u{2014}' => out.push(b'-'),
            '\u{2018}' | '\u{2019}' => out.push(b'\''),
            '\u{201c}' | '\u{201d}' => out.push(b'"'),
            '\u{2022}' => out.push(0x95),
            '\n' | '\r' | '\t' => out.push(b' '),
            c if u32::from(c) < 0x20 => {}
            c => {
                if let Ok(byte) = u8::try_from(u32::from(c)) {
                    out.push(byte);
                }
            }
        }
    }
    out
}
