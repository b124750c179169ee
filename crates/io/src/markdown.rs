//! Markdown table projection of a sheet.
//!
//! The table is the smallest rectangle that holds data:
//! 1. the first row holding any cell is the header row;
//! 2. the table starts at the leftmost column holding a cell;
//! 3. the header span runs right until the first header cell without
//!    display text or inline rich text;
//! 4. rows are emitted until one renders entirely empty.
//!
//! When the header row has no such gap within the sheet's stored width the
//! span is degenerate and nothing is emitted.

use sheetblock_engine::cell::{Alignment, Cell, CellFormat};
use sheetblock_engine::sheet::Sheet;

/// In-band marker for a line break inside a rich-text run.
pub const LINE_BREAK: &str = " [:br]";

/// Render a sheet as a Markdown table. Returns an empty string when the
/// sheet has no data or the header span is degenerate.
pub fn project(sheet: &Sheet) -> String {
    let Some(row_start) = sheet.first_row() else {
        return String::new();
    };
    let col_start = sheet.first_col_from(row_start).unwrap_or(0);
    let col_end = header_span_end(sheet, row_start, col_start);
    if col_end <= col_start {
        log::debug!("sheet {:?}: header row {} has no gap, nothing projected", sheet.name, row_start);
        return String::new();
    }

    let mut lines = Vec::new();
    for row in row_start..sheet.rows() {
        let rendered: Vec<String> = (col_start..col_end)
            .map(|col| sheet.get(row, col).map(render_cell).unwrap_or_default())
            .collect();

        if rendered.iter().all(String::is_empty) {
            break;
        }

        lines.push(table_row(&rendered));

        if row == row_start {
            let separator: Vec<&str> = (col_start..col_end)
                .map(|col| separator_token(sheet.get(row_start, col)))
                .collect();
            lines.push(table_row(&separator));
        }
    }

    lines.join("\n")
}

/// Exclusive end of the header span, or 0 when no gap is found.
fn header_span_end(sheet: &Sheet, header_row: usize, col_start: usize) -> usize {
    (col_start + 1..sheet.cols())
        .find(|&col| !sheet.get(header_row, col).map_or(false, Cell::has_text))
        .unwrap_or(0)
}

/// Render one cell's content with Markdown emphasis markers.
pub fn render_cell(cell: &Cell) -> String {
    if let Some(display) = &cell.display {
        return emphasize(display, &cell.format);
    }

    match cell.rich_segments() {
        Some(segments) => segments
            .iter()
            .map(|segment| {
                segment
                    .text
                    .split("\r\n")
                    .map(|line| emphasize(line, &segment.format))
                    .collect::<Vec<_>>()
                    .join(LINE_BREAK)
            })
            .collect::<String>()
            .trim()
            .to_string(),
        None => String::new(),
    }
}

/// Bold outermost, then strikethrough, italic innermost.
fn emphasize(text: &str, format: &CellFormat) -> String {
    let bold = if format.bold { "**" } else { "" };
    let strike = if format.strikethrough { "~~" } else { "" };
    let italic = if format.italic { "_" } else { "" };
    format!("{bold}{strike}{italic}{text}{italic}{strike}{bold}")
}

fn separator_token(header: Option<&Cell>) -> &'static str {
    match header.and_then(|c| c.format.alignment) {
        Some(Alignment::Center) => ":---:",
        Some(Alignment::Right) => "---:",
        _ => "---",
    }
}

fn table_row<S: AsRef<str>>(cells: &[S]) -> String {
    let cells: Vec<&str> = cells.iter().map(AsRef::as_ref).collect();
    format!("| {} |", cells.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetblock_engine::cell::RichSegment;
    use sheetblock_engine::sheet::SheetId;

    /// Sheet sized like the editor's default grid.
    fn grid() -> Sheet {
        Sheet::with_size(SheetId::default(), "Sheet1", 30, 20)
    }

    #[test]
    fn test_empty_sheet_projects_nothing() {
        assert_eq!(project(&grid()), "");
        assert_eq!(project(&Sheet::new(SheetId::default(), "Sheet1")), "");
    }

    #[test]
    fn test_stops_at_first_empty_row() {
        let mut sheet = grid();
        sheet.set_value(0, 0, "Name");
        sheet.set_value(0, 1, "Qty");
        sheet.set_value(1, 0, "Apples");
        sheet.set_value(1, 1, "3");
        // row 2 left empty; row 3 must not appear
        sheet.set_value(3, 0, "Hidden");
        sheet.set_value(3, 1, "9");

        let md = project(&sheet);
        assert_eq!(md, "| Name | Qty |\n| --- | --- |\n| Apples | 3 |");
        assert_eq!(md.lines().count(), 3);
    }

    #[test]
    fn test_offset_table() {
        let mut sheet = grid();
        sheet.set_value(2, 1, "A");
        sheet.set_value(2, 2, "B");
        sheet.set_value(3, 1, "1");
        sheet.set_value(3, 2, "2");
        // outside the header span, ignored
        sheet.set_value(3, 4, "x");

        assert_eq!(project(&sheet), "| A | B |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn test_single_column_table() {
        let mut sheet = grid();
        sheet.set_value(0, 0, "Only");
        sheet.set_value(1, 0, "v");
        sheet.set_value(1, 1, "ignored");

        assert_eq!(project(&sheet), "| Only |\n| --- |\n| v |");
    }

    #[test]
    fn test_header_without_gap_is_degenerate() {
        let mut sheet = Sheet::with_size(SheetId::default(), "Sheet1", 5, 3);
        sheet.set_value(0, 0, "a");
        sheet.set_value(0, 1, "b");
        sheet.set_value(0, 2, "c");
        sheet.set_value(1, 0, "1");

        assert_eq!(project(&sheet), "");
    }

    #[test]
    fn test_styles_nest_bold_strike_italic() {
        let mut sheet = grid();
        sheet.set_value(0, 0, "x");
        sheet.set_format(0, 0, CellFormat { bold: true, italic: true, ..CellFormat::default() });
        sheet.set_value(0, 1, "y");
        sheet.set_format(
            0,
            1,
            CellFormat { bold: true, italic: true, strikethrough: true, alignment: None },
        );

        let header = project(&sheet).lines().next().unwrap().to_string();
        assert_eq!(header, "| **_x_** | **~~_y_~~** |");
    }

    #[test]
    fn test_separator_alignment_from_header() {
        let mut sheet = grid();
        sheet.set_value(0, 0, "L");
        sheet.set_value(0, 1, "C");
        sheet.set_value(0, 2, "R");
        sheet.set_format(0, 1, CellFormat::aligned(Alignment::Center));
        sheet.set_format(0, 2, CellFormat::aligned(Alignment::Right));
        sheet.set_value(1, 0, "1");

        let md = project(&sheet);
        let separator = md.lines().nth(1).unwrap();
        assert_eq!(separator, "| --- | :---: | ---: |");
        assert_eq!(md.lines().nth(2).unwrap(), "| 1 |  |  |");
    }

    #[test]
    fn test_rich_segments_with_line_breaks() {
        let mut sheet = grid();
        sheet.set(
            0,
            0,
            Cell::inline(vec![
                RichSegment::new("Hello\r\nWorld", CellFormat::bold()),
                RichSegment::plain(" tail "),
            ]),
        );
        sheet.set_value(1, 0, "v");

        let header = project(&sheet).lines().next().unwrap().to_string();
        assert_eq!(header, "| **Hello** [:br]**World** tail |");
    }

    #[test]
    fn test_display_text_wins_over_raw_value() {
        let mut sheet = grid();
        let mut cell = Cell::from_input("0.5");
        cell.display = Some("50%".into());
        sheet.set_value(0, 0, "Rate");
        sheet.set(1, 0, cell);

        assert_eq!(project(&sheet), "| Rate |\n| --- |\n| 50% |");
    }

    #[test]
    fn test_cells_without_text_render_empty() {
        let mut sheet = grid();
        sheet.set_value(0, 0, "H");
        sheet.set_format(1, 0, CellFormat::italic());

        // formatted-but-empty cell renders empty, so the table ends at the header
        assert_eq!(project(&sheet), "| H |\n| --- |");
    }

    #[test]
    fn test_projection_does_not_mutate() {
        let mut sheet = grid();
        sheet.set_value(0, 0, "H");
        sheet.set_value(1, 0, "1");
        let before = sheet.clone();
        let _ = project(&sheet);
        assert_eq!(sheet, before);
    }
}
