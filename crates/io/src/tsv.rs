// Tab-separated text for the clipboard

use sheetblock_engine::range::SelectionRange;
use sheetblock_engine::sheet::Sheet;

/// Plain text of every cell in `range`: cells joined by tabs, rows by newlines.
/// Absent cells contribute empty fields so the rectangle keeps its shape.
pub fn range_to_tsv(sheet: &Sheet, range: &SelectionRange) -> String {
    let mut out = String::new();
    for (i, row) in range.rows().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, col) in range.cols().enumerate() {
            if j > 0 {
                out.push('\t');
            }
            out.push_str(&sheet.display(row, col));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetblock_engine::cell::{Cell, CellFormat, RichSegment};
    use sheetblock_engine::sheet::SheetId;

    #[test]
    fn test_rectangle_with_gaps() {
        let mut sheet = Sheet::new(SheetId::default(), "Sheet1");
        sheet.set_value(0, 0, "Name");
        sheet.set_value(0, 1, "Qty");
        sheet.set_value(1, 0, "Apples");
        // (1, 1) left empty

        let tsv = range_to_tsv(&sheet, &SelectionRange::new(0, 0, 1, 1));
        assert_eq!(tsv, "Name\tQty\nApples\t");
    }

    #[test]
    fn test_rich_text_is_unstyled() {
        let mut sheet = Sheet::new(SheetId::default(), "Sheet1");
        sheet.set(
            0,
            0,
            Cell::inline(vec![
                RichSegment::new("bold", CellFormat::bold()),
                RichSegment::plain(" plain"),
            ]),
        );
        assert_eq!(range_to_tsv(&sheet, &SelectionRange::cell(0, 0)), "bold plain");
    }
}
