//! Snapshot envelope codec.
//!
//! A workbook lives in the host document as a fenced JSON block: the literal
//! prefix "```json\n", the JSON array of sheets, and the literal suffix
//! "\n```". Sheets use the browser editor's wire shape (`name`, `index`,
//! `order`, `status`, dense `data` rows of cell objects or `null`); every
//! sheet key this codec does not interpret is carried through untouched.
//!
//! Grids larger than [`DENSE_CELL_LIMIT`] slots are written sparsely
//! instead: `data` is empty, cells go to `celldata` (`{r, c, v}`), and the
//! bounds to the `row`/`column` keys the editor uses for grid size.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sheetblock_engine::cell::Cell;
use sheetblock_engine::range::SelectionRange;
use sheetblock_engine::sheet::{Sheet, SheetId};
use sheetblock_engine::wire;
use sheetblock_engine::workbook::Workbook;

/// Opening fence; content starting with it is machine-generated data.
pub const OPEN_MARKER: &str = "```json";
pub const ENVELOPE_PREFIX: &str = "```json\n";
pub const ENVELOPE_SUFFIX: &str = "\n```";

/// Largest rows x cols grid written as dense `data` rows.
pub const DENSE_CELL_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// The opening marker or the closing `]` is missing.
    MissingEnvelope,
    /// The payload is not a parseable sheets document.
    Payload(String),
    /// Serialization failed.
    Encode(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnvelope => write!(f, "snapshot envelope markers not found"),
            Self::Payload(msg) => write!(f, "malformed snapshot payload: {msg}"),
            Self::Encode(msg) => write!(f, "snapshot encode error: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// True if a document node's content is a snapshot block.
pub fn is_snapshot(content: &str) -> bool {
    content.starts_with(OPEN_MARKER)
}

/// Wrap a workbook in the snapshot envelope.
///
/// Selection ranges are always written empty.
pub fn encode(workbook: &Workbook) -> Result<String, SnapshotError> {
    Ok(format!("{ENVELOPE_PREFIX}{}{ENVELOPE_SUFFIX}", encode_payload(workbook)?))
}

/// The bare JSON array of sheets.
pub fn encode_payload(workbook: &Workbook) -> Result<String, SnapshotError> {
    let active = workbook.active_sheet_index();
    let records: Vec<SheetOut<'_>> = workbook
        .sheets()
        .iter()
        .enumerate()
        .map(|(i, sheet)| SheetOut::new(sheet, i == active))
        .collect();
    serde_json::to_string(&records).map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Decode an enveloped snapshot.
///
/// The payload runs from just after the first opening marker through the
/// last `]`, so marker-like text inside cells cannot cut it short.
pub fn decode(text: &str) -> Result<Workbook, SnapshotError> {
    let start = text
        .find(OPEN_MARKER)
        .ok_or(SnapshotError::MissingEnvelope)?
        + OPEN_MARKER.len();
    let end = text
        .rfind(']')
        .map(|i| i + 1)
        .filter(|&end| end > start)
        .ok_or(SnapshotError::MissingEnvelope)?;
    decode_payload(&text[start..end])
}

/// Decode unwrapped JSON: either a bare array of sheets or the legacy
/// `{"data": [...]}` object.
pub fn decode_payload(json: &str) -> Result<Workbook, SnapshotError> {
    let value: Value =
        serde_json::from_str(json.trim()).map_err(|e| SnapshotError::Payload(e.to_string()))?;

    let sheets = match value {
        Value::Array(_) => value,
        Value::Object(mut object) => {
            log::debug!("decoding legacy {{\"data\": [...]}} payload");
            object
                .remove("data")
                .filter(Value::is_array)
                .ok_or_else(|| SnapshotError::Payload("object payload has no `data` array".into()))?
        }
        other => {
            return Err(SnapshotError::Payload(format!(
                "expected an array of sheets, found {}",
                json_kind(&other)
            )))
        }
    };

    let records: Vec<SheetIn> =
        serde_json::from_value(sheets).map_err(|e| SnapshotError::Payload(e.to_string()))?;

    let mut active = None;
    let mut sheets = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        if record.status && active.is_none() {
            active = Some(i);
        }
        sheets.push(record.into_sheet());
    }

    Ok(Workbook::from_sheets(sheets, active.unwrap_or(0)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Deserialize)]
struct SheetIn {
    #[serde(default, deserialize_with = "wire::text_or_empty::deserialize")]
    name: String,
    #[serde(default)]
    index: SheetId,
    #[serde(default, deserialize_with = "wire::index::deserialize")]
    order: usize,
    #[serde(default, deserialize_with = "wire::flag::deserialize")]
    status: bool,
    #[serde(default)]
    data: Vec<Vec<Option<Cell>>>,
    /// Sparse alternative to `data`, used when `data` holds nothing.
    #[serde(default)]
    celldata: Option<Vec<CellEntry>>,
    #[serde(default)]
    luckysheet_selection_range: Vec<SelectionRange>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct CellEntry {
    r: usize,
    c: usize,
    #[serde(default)]
    v: Option<Cell>,
}

impl SheetIn {
    fn into_sheet(mut self) -> Sheet {
        let cols = self.data.iter().map(Vec::len).max().unwrap_or(0);
        let mut sheet = Sheet::with_size(self.index, self.name, self.data.len(), cols);
        sheet.order = self.order;

        for (r, row) in self.data.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                if let Some(cell) = cell {
                    sheet.set(r, c, cell);
                }
            }
        }

        if let Some(celldata) = self.celldata.filter(|_| sheet.is_empty()) {
            if sheet.rows() == 0 {
                let rows = take_bound(&mut self.extra, "row");
                let cols = take_bound(&mut self.extra, "column");
                sheet.ensure_size(rows, cols);
            }
            for entry in celldata {
                if let Some(cell) = entry.v {
                    sheet.set(entry.r, entry.c, cell);
                }
            }
        }

        sheet.selection = self.luckysheet_selection_range;
        sheet.meta = self.extra;
        sheet
    }
}

/// Remove a numeric grid bound from the sheet keys. Anything else stays.
fn take_bound(extra: &mut Map<String, Value>, key: &str) -> usize {
    let bound = extra
        .get(key)
        .filter(|value| !value.is_null())
        .and_then(wire::parse_index);
    match bound {
        Some(bound) => {
            extra.remove(key);
            bound
        }
        None => 0,
    }
}

#[derive(Serialize)]
struct SheetOut<'a> {
    name: &'a str,
    index: &'a SheetId,
    order: usize,
    #[serde(serialize_with = "wire::flag::serialize")]
    status: bool,
    data: Vec<Vec<Option<&'a Cell>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    celldata: Option<Vec<CellOut<'a>>>,
    luckysheet_selection_range: [SelectionRange; 0],
    #[serde(flatten)]
    meta: Cow<'a, Map<String, Value>>,
}

#[derive(Serialize)]
struct CellOut<'a> {
    r: usize,
    c: usize,
    v: &'a Cell,
}

impl<'a> SheetOut<'a> {
    fn new(sheet: &'a Sheet, active: bool) -> Self {
        let (rows, cols) = (sheet.rows(), sheet.cols());
        let mut out = Self {
            name: &sheet.name,
            index: &sheet.id,
            order: sheet.order,
            status: active,
            data: Vec::new(),
            celldata: None,
            luckysheet_selection_range: [],
            meta: Cow::Borrowed(&sheet.meta),
        };

        if rows.saturating_mul(cols) <= DENSE_CELL_LIMIT {
            let mut data = vec![vec![None; cols]; rows];
            for ((r, c), cell) in sheet.cells() {
                data[r][c] = Some(cell);
            }
            out.data = data;
            return out;
        }

        log::debug!(
            "sheet {:?} is {}x{} with {} cells, writing celldata",
            sheet.name,
            rows,
            cols,
            sheet.cell_count()
        );
        out.celldata = Some(sheet.cells().map(|((r, c), v)| CellOut { r, c, v }).collect());
        let meta = out.meta.to_mut();
        meta.insert("row".into(), Value::from(rows));
        meta.insert("column".into(), Value::from(cols));
        out
    }
}
