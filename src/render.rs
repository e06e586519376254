use anyhow::Context;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::config::{Config, PageOptions};
use crate::layout::{CellContent, CellStyle, Document, LinkRef, SheetGrid, cell_address};

// Approximate glyph advance for Helvetica at 1pt, in mm.
const GLYPH_WIDTH_MM_PER_PT: f32 = 0.18;
const TEXT_PAD_MM: f32 = 1.2;

/// Writes the document as an xlsx workbook, one worksheet per sheet.
/// Reference cells become `HYPERLINK` formulas pointing at their registered
/// coordinate.
pub fn render_workbook(document: &Document, path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    for sheet in &document.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&sheet.name)
            .with_context(|| format!("invalid sheet name {:?}", sheet.name))?;
        for ((row, col), cell) in sheet.cells() {
            let mut format = cell_format(cell.style);
            if cell.content.label().contains('\n') {
                format = format.set_text_wrap();
            }
            let col = col as u16;
            if cell.merge_cols > 0 {
                worksheet.merge_range(
                    row,
                    col,
                    row,
                    col + cell.merge_cols,
                    cell.content.label(),
                    &format,
                )?;
                continue;
            }
            match &cell.content {
                CellContent::Blank => {
                    worksheet.write_blank(row, col, &format)?;
                }
                CellContent::Text(text) => {
                    worksheet.write_string_with_format(row, col, text, &format)?;
                }
                CellContent::Link(link) => {
                    worksheet.write_formula_with_format(
                        row,
                        col,
                        link_formula(link).as_str(),
                        &format,
                    )?;
                }
            }
        }
    }
    workbook
        .save(path)
        .with_context(|| format!("saving workbook to {}", path.display()))?;
    Ok(())
}

fn cell_format(style: CellStyle) -> Format {
    let mut format = Format::new();
    if style.borders.left {
        format = format.set_border_left(FormatBorder::Thin);
    }
    if style.borders.right {
        format = format.set_border_right(FormatBorder::Thin);
    }
    if style.borders.top {
        format = format.set_border_top(FormatBorder::Thin);
    }
    if style.borders.bottom {
        format = format.set_border_bottom(FormatBorder::Thin);
    }
    if style.centered {
        format = format.set_align(FormatAlign::Center);
    }
    format
}

/// In-workbook navigation formula, e.g. `HYPERLINK("#policy!A4","P2")`.
pub fn link_formula(link: &LinkRef) -> String {
    format!(
        "HYPERLINK(\"#{}!{}\",\"{}\")",
        quote_sheet_name(&link.sheet),
        cell_address(link.coord),
        link.label
    )
}

/// Sheet names with characters beyond `[A-Za-z0-9_]` need single quoting in
/// cell references. Embedded quotes are doubled.
fn quote_sheet_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Writes the document as a paginated pdf. Each sheet starts a fresh page;
/// sheets taller than one page continue onto overflow pages. Reference cells
/// degrade to their plain labels.
pub fn render_paginated(document: &Document, config: &Config, path: &Path) -> anyhow::Result<()> {
    let page = &config.page;
    let rows_per_page =
        (((page.height_mm - 2.0 * page.margin_mm) / page.row_height_mm) as u32).max(1);

    let (doc, first_page, first_layer) = PdfDocument::new(
        "cloud state report",
        Mm(page.width_mm),
        Mm(page.height_mm),
        "content",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("loading builtin font")?;

    let mut first = Some((first_page, first_layer));
    for sheet in &document.sheets {
        let height = sheet.height().max(1);
        let mut band_start = 0;
        while band_start < height {
            let band_end = (band_start + rows_per_page).min(height);
            let (page_index, layer_index) = match first.take() {
                Some(indices) => indices,
                None => doc.add_page(Mm(page.width_mm), Mm(page.height_mm), "content"),
            };
            let layer = doc.get_page(page_index).get_layer(layer_index);
            layer.set_outline_thickness(page.line_width_mm);
            draw_band(&layer, &font, sheet, band_start, band_end, page);
            band_start = band_end;
        }
    }

    let file = File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .with_context(|| format!("saving pdf to {}", path.display()))?;
    Ok(())
}

/// Draws rows `band_start..band_end` of one sheet onto one page.
fn draw_band(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    sheet: &SheetGrid,
    band_start: u32,
    band_end: u32,
    page: &PageOptions,
) {
    let usable = page.width_mm - 2.0 * page.margin_mm;
    let col_width = usable / sheet.width() as f32;
    let row_height = page.row_height_mm;
    let page_top = page.height_mm - page.margin_mm;

    for ((row, col), cell) in sheet.cells() {
        if row < band_start || row >= band_end {
            continue;
        }
        let x = page.margin_mm + col as f32 * col_width;
        let top = page_top - (row - band_start) as f32 * row_height;
        let bottom = top - row_height;
        let width = col_width * (1 + cell.merge_cols) as f32;

        let b = cell.style.borders;
        if b.left {
            stroke(layer, (x, top), (x, bottom));
        }
        if b.right {
            stroke(layer, (x + width, top), (x + width, bottom));
        }
        if b.top {
            stroke(layer, (x, top), (x + width, top));
        }
        if b.bottom {
            stroke(layer, (x, bottom), (x + width, bottom));
        }

        let label = first_line(cell.content.label(), width, page.font_size);
        if label.is_empty() {
            continue;
        }
        let text_width = label.chars().count() as f32 * page.font_size * GLYPH_WIDTH_MM_PER_PT;
        let text_x = if cell.style.centered {
            x + ((width - text_width) / 2.0).max(TEXT_PAD_MM)
        } else {
            x + TEXT_PAD_MM
        };
        let baseline = top - row_height * 0.65;
        layer.use_text(label, page.font_size, Mm(text_x), Mm(baseline), font);
    }

    // outer bounding box per block, clamped to the rows on this page
    for span in sheet.blocks() {
        if span.end_row < band_start || span.start_row >= band_end {
            continue;
        }
        let top_row = span.start_row.max(band_start);
        let bottom_row = span.end_row.min(band_end - 1);
        let top = page_top - (top_row - band_start) as f32 * row_height;
        let bottom = page_top - (bottom_row - band_start + 1) as f32 * row_height;
        let left = page.margin_mm;
        let right = page.margin_mm + usable;
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(left), Mm(top)), false),
                (Point::new(Mm(right), Mm(top)), false),
                (Point::new(Mm(right), Mm(bottom)), false),
                (Point::new(Mm(left), Mm(bottom)), false),
            ],
            is_closed: true,
        });
    }
}

fn stroke(layer: &PdfLayerReference, from: (f32, f32), to: (f32, f32)) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    });
}

/// First line of the label, truncated to the cell width with an ellipsis
/// when content is cut off.
fn first_line(label: &str, cell_width: f32, font_size: f32) -> String {
    let mut lines = label.lines();
    let Some(line) = lines.next() else {
        return String::new();
    };
    let multi_line = lines.next().is_some();
    let glyph_width = font_size * GLYPH_WIDTH_MM_PER_PT;
    let max_chars = (((cell_width - 2.0 * TEXT_PAD_MM) / glyph_width) as usize).max(1);
    if line.chars().count() <= max_chars && !multi_line {
        return line.to_string();
    }
    let keep = max_chars.saturating_sub(1).max(1);
    let mut truncated: String = line.chars().take(keep).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_formula_targets_the_registered_coordinate() {
        let link = LinkRef {
            sheet: "policy".to_string(),
            coord: (3, 0),
            label: "P2".to_string(),
        };
        assert_eq!(link_formula(&link), "HYPERLINK(\"#policy!A4\",\"P2\")");
    }

    #[test]
    fn sheet_names_with_separators_are_quoted() {
        let link = LinkRef {
            sheet: "security-group".to_string(),
            coord: (0, 0),
            label: "sg-1".to_string(),
        };
        assert_eq!(
            link_formula(&link),
            "HYPERLINK(\"#'security-group'!A1\",\"sg-1\")"
        );
        assert_eq!(quote_sheet_name("policy"), "policy");
    }

    #[test]
    fn first_line_truncates_long_and_multi_line_text() {
        assert_eq!(first_line("short", 90.0, 10.0), "short");
        let cut = first_line("{\n\"a\":1\n}", 90.0, 10.0);
        assert!(cut.ends_with('…'));
        assert!(cut.starts_with('{'));
        let long = first_line(&"x".repeat(400), 20.0, 10.0);
        assert!(long.chars().count() <= 10);
    }
}
