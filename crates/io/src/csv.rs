// CSV/TSV export of a sheet's displayed text

use std::io::Write;
use std::path::Path;

use sheetblock_engine::sheet::Sheet;

pub fn export(sheet: &Sheet, path: &Path) -> Result<(), String> {
    export_with_delimiter(sheet, path, b',')
}

pub fn export_tsv(sheet: &Sheet, path: &Path) -> Result<(), String> {
    export_with_delimiter(sheet, path, b'\t')
}

fn export_with_delimiter(sheet: &Sheet, path: &Path, delimiter: u8) -> Result<(), String> {
    let file = std::fs::File::create(path).map_err(|e| e.to_string())?;
    write_delimited(sheet, file, delimiter)
}

/// Write every row that has data. Trailing empty cells are omitted, so rows
/// can have different field counts. Only stored cells are visited.
pub fn write_delimited<W: Write>(sheet: &Sheet, writer: W, delimiter: u8) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(writer);

    let mut current: Option<usize> = None;
    let mut record: Vec<String> = Vec::new();

    for ((row, col), cell) in sheet.cells() {
        let value = cell.plain_text();
        if value.is_empty() {
            continue;
        }
        if current != Some(row) {
            if current.is_some() {
                writer.write_record(&record).map_err(|e| e.to_string())?;
            }
            record.clear();
            current = Some(row);
        }
        if record.len() < col {
            record.resize(col, String::new());
        }
        record.push(value);
    }
    if current.is_some() {
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}
