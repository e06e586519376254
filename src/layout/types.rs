use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

/// Zero-based (row, column) grid coordinate.
pub type Coord = (u32, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Borders {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Borders {
    pub const NONE: Borders = Borders {
        left: false,
        right: false,
        top: false,
        bottom: false,
    };
    /// All four edges, the style of headers and standalone cells.
    pub const BOX: Borders = Borders {
        left: true,
        right: true,
        top: true,
        bottom: true,
    };
    /// Left and right only, the style of list body rows.
    pub const SIDES: Borders = Borders {
        left: true,
        right: true,
        top: false,
        bottom: false,
    };
    /// Sides plus a closing bottom edge, used on the last row of a block.
    pub const SIDES_BOTTOM: Borders = Borders {
        left: true,
        right: true,
        top: false,
        bottom: true,
    };
    pub const LEFT: Borders = Borders {
        left: true,
        right: false,
        top: false,
        bottom: false,
    };
    pub const RIGHT: Borders = Borders {
        left: false,
        right: true,
        top: false,
        bottom: false,
    };
    /// Top only, the divider row closing a block from below.
    pub const TOP: Borders = Borders {
        left: false,
        right: false,
        top: true,
        bottom: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub borders: Borders,
    pub centered: bool,
}

impl CellStyle {
    pub fn bordered(borders: Borders) -> Self {
        Self {
            borders,
            centered: false,
        }
    }

    pub fn centered(borders: Borders) -> Self {
        Self {
            borders,
            centered: true,
        }
    }
}

/// A resolved cross reference: activating the cell navigates to `coord` on
/// `sheet`. Print output degrades this to the plain label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub sheet: String,
    pub coord: Coord,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    /// Style carrier only, written for border filling.
    Blank,
    Text(String),
    Link(LinkRef),
}

impl CellContent {
    /// Text shown in media without link support.
    pub fn label(&self) -> &str {
        match self {
            CellContent::Blank => "",
            CellContent::Text(text) => text,
            CellContent::Link(link) => &link.label,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub content: CellContent,
    pub style: CellStyle,
    /// Extra columns this cell spans to the right.
    pub merge_cols: u16,
}

/// Row range of one parent entity's rendered region, closed on both ends.
/// The paginated emitter draws one outer bounding box per span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start_row: u32,
    pub end_row: u32,
}

/// One sheet (or page) of the report: a sparse cell grid plus the write
/// cursor that layout advances block by block.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    cells: BTreeMap<Coord, Cell>,
    blocks: Vec<BlockSpan>,
    cursor: u32,
    open_block: Option<u32>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            blocks: Vec::new(),
            cursor: 0,
            open_block: None,
        }
    }

    /// Current cursor row.
    pub fn row(&self) -> u32 {
        self.cursor
    }

    pub fn advance(&mut self, rows: u32) {
        self.cursor += rows;
    }

    pub fn put_text(&mut self, row: u32, col: u32, text: impl Into<String>, style: CellStyle) {
        self.cells.insert(
            (row, col),
            Cell {
                content: CellContent::Text(text.into()),
                style,
                merge_cols: 0,
            },
        );
    }

    pub fn put_merged_text(
        &mut self,
        row: u32,
        col: u32,
        extra_cols: u16,
        text: impl Into<String>,
        style: CellStyle,
    ) {
        self.cells.insert(
            (row, col),
            Cell {
                content: CellContent::Text(text.into()),
                style,
                merge_cols: extra_cols,
            },
        );
    }

    pub fn put_link(&mut self, row: u32, col: u32, link: LinkRef, style: CellStyle) {
        self.cells.insert(
            (row, col),
            Cell {
                content: CellContent::Link(link),
                style,
                merge_cols: 0,
            },
        );
    }

    /// Border filler: writes a style-only cell, leaving already written cells
    /// untouched so padding never clobbers content styling.
    pub fn put_blank(&mut self, row: u32, col: u32, style: CellStyle) {
        self.cells.entry((row, col)).or_insert(Cell {
            content: CellContent::Blank,
            style,
            merge_cols: 0,
        });
    }

    /// Squares off a block of parallel sibling lists: every row in
    /// `start_row .. start_row + rows` receives the given border in each
    /// listed column, so the shorter list's column range still renders as a
    /// uniform bordered rectangle.
    pub fn pad_columns(&mut self, start_row: u32, rows: u32, columns: &[(u32, Borders)]) {
        for offset in 0..rows {
            for &(col, borders) in columns {
                self.put_blank(start_row + offset, col, CellStyle::bordered(borders));
            }
        }
    }

    /// Closing divider: a top-border-only row under the given columns.
    /// Advances the cursor past it.
    pub fn divider(&mut self, cols: &[u32]) {
        let row = self.cursor;
        for &col in cols {
            self.put_blank(row, col, CellStyle::bordered(Borders::TOP));
        }
        self.advance(1);
    }

    pub fn begin_block(&mut self) {
        self.open_block = Some(self.cursor);
    }

    pub fn end_block(&mut self) {
        if let Some(start_row) = self.open_block.take() {
            if self.cursor > start_row {
                self.blocks.push(BlockSpan {
                    start_row,
                    end_row: self.cursor - 1,
                });
            }
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, &Cell)> {
        self.cells.iter().map(|(&coord, cell)| (coord, cell))
    }

    pub fn blocks(&self) -> &[BlockSpan] {
        &self.blocks
    }

    /// Total rows the sheet occupies.
    pub fn height(&self) -> u32 {
        let written = self
            .cells
            .keys()
            .next_back()
            .map(|&(row, _)| row + 1)
            .unwrap_or(0);
        written.max(self.cursor)
    }

    /// Number of columns, counting merge spans.
    pub fn width(&self) -> u32 {
        self.cells
            .iter()
            .map(|(&(_, col), cell)| col + u32::from(cell.merge_cols) + 1)
            .max()
            .unwrap_or(1)
    }
}

/// Ordered sheets of one report.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub sheets: Vec<SheetGrid>,
}

impl Document {
    pub fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

/// Per-sheet map from entity key to its anchor coordinate. Append-only;
/// registries for referenced (leaf) sheets are fully populated before any
/// referencing sheet is laid out.
#[derive(Debug, Clone)]
pub struct Registry {
    sheet: String,
    anchors: HashMap<String, Coord>,
}

impl Registry {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            anchors: HashMap::new(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn register(&mut self, key: impl Into<String>, coord: Coord) {
        self.anchors.insert(key.into(), coord);
    }

    /// `None` is not an error; the caller renders an unlinked label or
    /// nothing at all.
    pub fn lookup(&self, key: &str) -> Option<Coord> {
        self.anchors.get(key).copied()
    }

    /// Cross-reference resolver: a reference cell pointing at the registered
    /// coordinate, or `None` for a dangling key.
    pub fn resolve(&self, key: &str, label: &str) -> Option<LinkRef> {
        self.lookup(key).map(|coord| LinkRef {
            sheet: self.sheet.clone(),
            coord,
            label: label.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Encodes a zero-based column index as spreadsheet letters (0 -> A,
/// 25 -> Z, 26 -> AA, 701 -> ZZ).
pub fn column_letters(col: u32) -> String {
    let mut out = String::new();
    let mut value = col;
    loop {
        out.insert(0, char::from(b'A' + (value % 26) as u8));
        if value < 26 {
            break;
        }
        value = value / 26 - 1;
    }
    out
}

pub fn parse_column_letters(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (ch as u32 - 'A' as u32 + 1);
    }
    Some(col - 1)
}

/// One-based `A1` style address for a zero-based coordinate.
pub fn cell_address(coord: Coord) -> String {
    let (row, col) = coord;
    format!("{}{}", column_letters(col), row + 1)
}

/// Grid wrap position of element `i` in a fixed-width block, relative to the
/// block's first row.
pub fn grid_slot(index: usize, width: usize) -> Coord {
    ((index / width) as u32, (index % width) as u32)
}

/// Row span of a wrapped block: always at least one row so a trailing
/// divider has something to close against.
pub fn grid_rows(count: usize, width: usize) -> u32 {
    (count.div_ceil(width)).max(1) as u32
}

/// First-occurrence-order dedup over a stable entity key.
pub fn dedup_by_key<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_known_values() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
    }

    #[test]
    fn column_letters_round_trip() {
        for col in 0..=701 {
            let letters = column_letters(col);
            assert_eq!(parse_column_letters(&letters), Some(col), "col {col}");
        }
    }

    #[test]
    fn cell_address_is_one_based() {
        assert_eq!(cell_address((3, 0)), "A4");
        assert_eq!(cell_address((0, 27)), "AB1");
    }

    #[test]
    fn grid_wrap_positions() {
        assert_eq!(grid_slot(0, 7), (0, 0));
        assert_eq!(grid_slot(6, 7), (0, 6));
        assert_eq!(grid_slot(7, 7), (1, 0));
        assert_eq!(grid_rows(0, 7), 1);
        assert_eq!(grid_rows(7, 7), 1);
        assert_eq!(grid_rows(8, 7), 2);
    }

    #[test]
    fn dedup_keeps_first_occurrence_and_is_idempotent() {
        let items = vec!["a", "b", "a", "c", "b"];
        let once = dedup_by_key(items, |s| s.to_string());
        assert_eq!(once, vec!["a", "b", "c"]);
        let twice = dedup_by_key(once.clone(), |s| s.to_string());
        assert_eq!(twice, once);
    }

    #[test]
    fn registry_resolves_registered_keys_only() {
        let mut registry = Registry::new("policy");
        registry.register("K", (3, 0));
        let link = registry.resolve("K", "K").expect("registered key");
        assert_eq!(link.sheet, "policy");
        assert_eq!(cell_address(link.coord), "A4");
        assert!(registry.resolve("missing", "missing").is_none());
    }

    #[test]
    fn padding_never_clobbers_written_cells() {
        let mut sheet = SheetGrid::new("test");
        sheet.put_text(0, 0, "kept", CellStyle::bordered(Borders::BOX));
        sheet.pad_columns(0, 2, &[(0, Borders::SIDES), (1, Borders::SIDES)]);
        let kept = sheet.cell(0, 0).expect("cell written");
        assert_eq!(kept.style.borders, Borders::BOX);
        assert_eq!(kept.content, CellContent::Text("kept".to_string()));
        let filled = sheet.cell(1, 0).expect("pad cell");
        assert_eq!(filled.style.borders, Borders::SIDES);
        assert_eq!(filled.content, CellContent::Blank);
    }

    #[test]
    fn divider_closes_block_and_advances() {
        let mut sheet = SheetGrid::new("test");
        sheet.begin_block();
        sheet.put_text(0, 0, "header", CellStyle::bordered(Borders::BOX));
        sheet.advance(1);
        sheet.end_block();
        sheet.divider(&[0, 1]);
        assert_eq!(sheet.row(), 2);
        assert_eq!(
            sheet.blocks(),
            &[BlockSpan {
                start_row: 0,
                end_row: 0
            }]
        );
        let divider = sheet.cell(1, 1).expect("divider cell");
        assert_eq!(divider.style.borders, Borders::TOP);
    }
}
