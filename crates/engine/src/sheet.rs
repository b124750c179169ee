use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cell::{Cell, CellFormat};
use super::range::SelectionRange;

/// Stable sheet identifier (`index` on the wire).
///
/// The browser editor uses plain integers for sheets it creates and opaque
/// strings for imported ones, so both are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetId {
    Number(u64),
    Text(String),
}

impl Default for SheetId {
    fn default() -> Self {
        SheetId::Number(0)
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetId::Number(n) => write!(f, "{n}"),
            SheetId::Text(s) => f.write_str(s),
        }
    }
}

/// A single sheet: sparse cell storage plus the stored (dense) bounds.
///
/// `rows`/`cols` are the extent of the grid as persisted, not a storage
/// limit. Writing outside them grows them. A sheet with no rows has no
/// columns either.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    pub order: usize,
    cells: BTreeMap<(usize, usize), Cell>,
    rows: usize,
    cols: usize,
    /// Transient editor state, never persisted.
    pub selection: Vec<SelectionRange>,
    /// Sheet attributes this crate does not interpret (config, charts, color...).
    pub meta: Map<String, Value>,
}

impl Sheet {
    pub fn new(id: SheetId, name: impl Into<String>) -> Self {
        Self::with_size(id, name, 0, 0)
    }

    pub fn with_size(id: SheetId, name: impl Into<String>, rows: usize, cols: usize) -> Self {
        let mut sheet = Self {
            id,
            name: name.into(),
            order: 0,
            cells: BTreeMap::new(),
            rows: 0,
            cols: 0,
            selection: Vec::new(),
            meta: Map::new(),
        };
        sheet.ensure_size(rows, cols);
        sheet
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Grow the stored bounds to at least `rows` x `cols`.
    pub fn ensure_size(&mut self, rows: usize, cols: usize) {
        self.rows = self.rows.max(rows);
        self.cols = self.cols.max(cols);
        if self.rows == 0 {
            self.cols = 0;
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.ensure_size(row + 1, col + 1);
        self.cells.insert((row, col), cell);
    }

    /// Set a cell from user input. Blank input clears the cell.
    pub fn set_value(&mut self, row: usize, col: usize, input: &str) {
        let cell = Cell::from_input(input);
        if cell == Cell::new() {
            self.cells.remove(&(row, col));
            return;
        }
        let format = self.get(row, col).map(|c| c.format).unwrap_or_default();
        self.set(row, col, cell.with_format(format));
    }

    /// Replace the formatting of a cell, creating an empty formatted cell if needed.
    pub fn set_format(&mut self, row: usize, col: usize, format: CellFormat) {
        self.ensure_size(row + 1, col + 1);
        self.cells.entry((row, col)).or_default().set_format(format);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// All stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), &Cell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// First row holding any stored cell.
    pub fn first_row(&self) -> Option<usize> {
        self.cells.keys().next().map(|(row, _)| *row)
    }

    /// Leftmost column holding a stored cell at or below `row`.
    pub fn first_col_from(&self, row: usize) -> Option<usize> {
        self.cells
            .range((row, 0)..)
            .map(|((_, col), _)| *col)
            .min()
    }

    /// Text shown for a cell, empty when the cell is absent.
    pub fn display(&self, row: usize, col: usize) -> String {
        self.get(row, col).map(Cell::plain_text).unwrap_or_default()
    }

    pub fn last_selection(&self) -> Option<&SelectionRange> {
        self.selection.last()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    #[test]
    fn test_set_grows_bounds() {
        let mut sheet = Sheet::new(SheetId::default(), "Sheet1");
        assert_eq!((sheet.rows(), sheet.cols()), (0, 0));

        sheet.set_value(4, 2, "x");
        assert_eq!((sheet.rows(), sheet.cols()), (5, 3));

        sheet.set_value(1, 7, "y");
        assert_eq!((sheet.rows(), sheet.cols()), (5, 8));
    }

    #[test]
    fn test_zero_rows_means_zero_cols() {
        let sheet = Sheet::with_size(SheetId::default(), "Sheet1", 0, 12);
        assert_eq!(sheet.cols(), 0);
    }

    #[test]
    fn test_blank_input_clears_cell() {
        let mut sheet = Sheet::new(SheetId::default(), "Sheet1");
        sheet.set_value(0, 0, "hello");
        assert_eq!(sheet.cell_count(), 1);
        sheet.set_value(0, 0, "  ");
        assert!(sheet.is_empty());
        // bounds are not shrunk
        assert_eq!(sheet.rows(), 1);
    }

    #[test]
    fn test_set_value_keeps_format() {
        let mut sheet = Sheet::new(SheetId::default(), "Sheet1");
        sheet.set_format(0, 0, CellFormat::bold());
        sheet.set_value(0, 0, "12");
        let cell = sheet.get(0, 0).unwrap();
        assert!(cell.format.bold);
        assert!(matches!(cell.value, CellValue::Number(_)));
    }

    #[test]
    fn test_first_row_and_col() {
        let mut sheet = Sheet::new(SheetId::default(), "Sheet1");
        assert_eq!(sheet.first_row(), None);

        sheet.set_value(3, 5, "a");
        sheet.set_value(6, 1, "b");
        sheet.set_value(2, 9, "c");
        assert_eq!(sheet.first_row(), Some(2));
        assert_eq!(sheet.first_col_from(2), Some(1));
        assert_eq!(sheet.first_col_from(7), None);
    }

    #[test]
    fn test_sheet_id_display() {
        assert_eq!(SheetId::Number(3).to_string(), "3");
        assert_eq!(SheetId::Text("Sheet_a1".into()).to_string(), "Sheet_a1");
    }
}
