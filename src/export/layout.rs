//! Text measurement, word wrapping and table pagination.
//!
//! All positions are in points measured from the top edge of the page.

use super::pdf::to_win_ansi;

/// Approximate Helvetica advance width of `text` at `font_size`.
///
/// Measures the WinAnsi form that is actually drawn, so folded and dropped
/// characters are accounted for.
pub fn helvetica_width(text: &str, font_size: f32) -> f32 {
    let em: f32 = to_win_ansi(text)
        .into_iter()
        .map(|byte| match char::from(byte) {
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.25,
            ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '/' | '-' => 0.33,
            'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.85,
            'A'..='Z' => 0.68,
            '0'..='9' => 0.56,
            _ => 0.52,
        })
        .sum();
    em * font_size
}

/// Break `text` into lines no wider than `max_width`.
///
/// Words are never split unless a single word exceeds the width on its own,
/// in which case it is broken at character boundaries.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if measure(word) <= max_width {
            current = word.to_string();
        } else {
            for c in word.chars() {
                let mut next = current.clone();
                next.push(c);
                if measure(&next) > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                } else {
                    current = next;
                }
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Page geometry a table is laid out against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    /// Left/right/top/bottom margin.
    pub margin: f32,
}

impl PageGeometry {
    /// A4 portrait in points.
    pub const A4: Self = Self {
        width: 595.28,
        height: 841.89,
        margin: 40.0,
    };

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Lowest y a drawing may reach.
    pub fn bottom(&self) -> f32 {
        self.height - self.margin
    }
}

/// Cell padding inside table rows.
pub const CELL_PADDING: f32 = 4.0;
/// Line height as a multiple of the font size.
pub const LINE_SPACING: f32 = 1.2;

/// One row placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    /// Pages after the one the table started on.
    pub page_offset: usize,
    /// Top edge of the row.
    pub top: f32,
    pub height: f32,
    pub is_header: bool,
    /// Wrapped lines per cell.
    pub cells: Vec<Vec<String>>,
}

/// Result of laying out a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub column_width: f32,
    pub rows: Vec<PlacedRow>,
    /// Bottom edge of the last row, on the last page used.
    pub end_y: f32,
    /// Number of pages spanned after the starting page.
    pub extra_pages: usize,
}

/// Lay out a header row plus body rows starting at `start_y`.
///
/// Columns share the content width equally. When a row would cross the
/// bottom margin it moves to a fresh page and the header row is repeated.
pub fn layout_table(
    headers: &[String],
    rows: &[Vec<String>],
    start_y: f32,
    font_size: f32,
    page: PageGeometry,
    measure: impl Fn(&str) -> f32,
) -> TableLayout {
    let columns = headers.len().max(1);
    let column_width = page.content_width() / columns as f32;
    let text_width = (column_width - 2.0 * CELL_PADDING).max(1.0);
    let line_height = font_size * LINE_SPACING;

    let wrap_row = |row: &[String]| -> (Vec<Vec<String>>, f32) {
        let cells: Vec<Vec<String>> = row
            .iter()
            .map(|cell| {
                let lines = wrap_text(cell, text_width, &measure);
                if lines.is_empty() { vec![String::new()] } else { lines }
            })
            .collect();
        let max_lines = cells.iter().map(Vec::len).max().unwrap_or(1);
        let height = max_lines as f32 * line_height + 2.0 * CELL_PADDING;
        (cells, height)
    };

    let (header_cells, header_height) = wrap_row(headers);
    let mut placed = Vec::with_capacity(rows.len() + 1);
    let mut page_offset = 0;
    let mut y = start_y;

    if y + header_height > page.bottom() {
        page_offset += 1;
        y = page.margin;
    }
    placed.push(PlacedRow {
        page_offset,
        top: y,
        height: header_height,
        is_header: true,
        cells: header_cells.clone(),
    });
    y += header_height;

    for row in rows {
        let (cells, height) = wrap_row(row);
        if y + height > page.bottom() {
            page_offset += 1;
            y = page.margin;
            placed.push(PlacedRow {
                page_offset,
                top: y,
                height: header_height,
                is_header: true,
                cells: header_cells.clone(),
            });
            y += header_height;
        }
        placed.push(PlacedRow {
            page_offset,
            top: y,
            height,
            is_header: false,
            cells,
        });
        y += height;
    }

    TableLayout {
        column_width,
        rows: placed,
        end_y: y,
        extra_pages: page_offset,
    }
}
