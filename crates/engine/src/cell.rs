use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::wire;

/// Cell type code marking inline rich text (`ct.t`).
pub const INLINE_STRING: &str = "inlineStr";

/// Horizontal text alignment
///
/// Wire codes follow the browser editor: `0` center, `1` left, `2` right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn code(self) -> u8 {
        match self {
            Alignment::Center => 0,
            Alignment::Left => 1,
            Alignment::Right => 2,
        }
    }

    /// Parse a wire code. Unknown codes and `null` yield `None`.
    pub fn from_code(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        match wire::parse_index(value)? {
            0 => Some(Alignment::Center),
            1 => Some(Alignment::Left),
            2 => Some(Alignment::Right),
            _ => None,
        }
    }
}

impl Serialize for Alignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Move a recognised `ht` code from the unparsed attributes into `format`.
/// Unknown codes stay in `extra` and are written back unchanged.
fn lift_alignment(format: &mut CellFormat, extra: &mut Map<String, Value>) {
    if let Some(alignment) = extra.get("ht").and_then(Alignment::from_code) {
        format.alignment = Some(alignment);
        extra.remove("ht");
    }
}

/// Cell (or rich segment) formatting flags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellFormat {
    #[serde(rename = "bl", default, with = "wire::flag", skip_serializing_if = "wire::is_false")]
    pub bold: bool,
    #[serde(rename = "it", default, with = "wire::flag", skip_serializing_if = "wire::is_false")]
    pub italic: bool,
    #[serde(rename = "cl", default, with = "wire::flag", skip_serializing_if = "wire::is_false")]
    pub strikethrough: bool,
    /// Only meaningful on header-row cells when projecting to Markdown.
    /// Read by the owning cell or segment so unknown codes are kept.
    #[serde(rename = "ht", skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
}

impl CellFormat {
    pub fn bold() -> Self {
        Self { bold: true, ..Self::default() }
    }

    pub fn italic() -> Self {
        Self { italic: true, ..Self::default() }
    }

    pub fn strikethrough() -> Self {
        Self { strikethrough: true, ..Self::default() }
    }

    pub fn aligned(alignment: Alignment) -> Self {
        Self { alignment: Some(alignment), ..Self::default() }
    }

    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.strikethrough
    }
}

/// Raw scalar value of a cell (`v`)
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl CellValue {
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Null;
        }

        if let Ok(n) = trimmed.parse::<i64>() {
            return CellValue::Number(Number::from(n));
        }

        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return CellValue::Number(n);
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        CellValue::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }

    /// Cell type code the browser editor stores alongside this value.
    fn type_code(&self) -> &'static str {
        match self {
            CellValue::Number(_) => "n",
            CellValue::Bool(_) => "b",
            _ => "g",
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Number(n) => n.serialize(serializer),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(CellValue::Null),
            Value::Bool(b) => Ok(CellValue::Bool(b)),
            Value::Number(n) => Ok(CellValue::Number(n)),
            Value::String(s) => Ok(CellValue::Text(s)),
            other => Err(D::Error::custom(format!("cell value must be a scalar, found {other}"))),
        }
    }
}

/// One styled run of inline rich text (`ct.s[i]`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SegmentWire")]
pub struct RichSegment {
    #[serde(rename = "v")]
    pub text: String,
    #[serde(flatten)]
    pub format: CellFormat,
    /// Font, color and size attributes, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct SegmentWire {
    #[serde(rename = "v", default, deserialize_with = "wire::text_or_empty::deserialize")]
    text: String,
    #[serde(flatten)]
    format: CellFormat,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<SegmentWire> for RichSegment {
    fn from(mut wire: SegmentWire) -> Self {
        lift_alignment(&mut wire.format, &mut wire.extra);
        Self { text: wire.text, format: wire.format, extra: wire.extra }
    }
}

impl RichSegment {
    pub fn new(text: impl Into<String>, format: CellFormat) -> Self {
        Self { text: text.into(), format, extra: Map::new() }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, CellFormat::default())
    }
}

/// Cell type descriptor (`ct`): number format code, type code, rich runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellType {
    #[serde(rename = "fa", default, skip_serializing_if = "Option::is_none")]
    pub format_code: Option<String>,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
    #[serde(rename = "s", default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<RichSegment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CellType {
    pub fn general(type_code: &str) -> Self {
        Self {
            format_code: Some("General".to_string()),
            type_code: Some(type_code.to_string()),
            ..Self::default()
        }
    }

    pub fn inline(segments: Vec<RichSegment>) -> Self {
        Self {
            format_code: Some("General".to_string()),
            type_code: Some(INLINE_STRING.to_string()),
            segments,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CellWire")]
pub struct Cell {
    #[serde(rename = "v", skip_serializing_if = "CellValue::is_null")]
    pub value: CellValue,
    /// Precomputed display text (`m`); wins over `value` when rendering.
    #[serde(rename = "m", skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(rename = "f", skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(rename = "ct", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CellType>,
    #[serde(flatten)]
    pub format: CellFormat,
    /// Attributes this crate does not interpret (fonts, colors, merges...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct CellWire {
    #[serde(rename = "v", default)]
    value: CellValue,
    #[serde(rename = "m", default, deserialize_with = "wire::text::deserialize")]
    display: Option<String>,
    #[serde(rename = "f", default)]
    formula: Option<String>,
    #[serde(rename = "ct", default)]
    kind: Option<CellType>,
    #[serde(flatten)]
    format: CellFormat,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<CellWire> for Cell {
    fn from(mut wire: CellWire) -> Self {
        lift_alignment(&mut wire.format, &mut wire.extra);
        Self {
            value: wire.value,
            display: wire.display,
            formula: wire.formula,
            kind: wire.kind,
            format: wire.format,
            extra: wire.extra,
        }
    }
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cell the way the editor does when a user types `input`.
    pub fn from_input(input: &str) -> Self {
        let value = CellValue::from_input(input);
        if value.is_null() {
            return Self::new();
        }
        let kind = CellType::general(value.type_code());
        Self {
            display: Some(value.raw_display()),
            kind: Some(kind),
            value,
            ..Self::default()
        }
    }

    /// Inline rich-text cell made of styled runs.
    pub fn inline(segments: Vec<RichSegment>) -> Self {
        Self {
            kind: Some(CellType::inline(segments)),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: CellFormat) -> Self {
        self.set_format(format);
        self
    }

    /// Replace the formatting. A known alignment supersedes a kept unknown code.
    pub fn set_format(&mut self, format: CellFormat) {
        if format.alignment.is_some() {
            self.extra.remove("ht");
        }
        self.format = format;
    }

    pub fn is_inline_string(&self) -> bool {
        self.kind
            .as_ref()
            .and_then(|k| k.type_code.as_deref())
            .map_or(false, |t| t == INLINE_STRING)
    }

    /// Rich runs, only when the cell is an inline string.
    pub fn rich_segments(&self) -> Option<&[RichSegment]> {
        if self.is_inline_string() {
            self.kind.as_ref().map(|k| k.segments.as_slice())
        } else {
            None
        }
    }

    /// True when the cell carries renderable text: display text or inline runs.
    pub fn has_text(&self) -> bool {
        self.display.is_some() || self.is_inline_string()
    }

    /// Unstyled text, as copied to the clipboard.
    pub fn plain_text(&self) -> String {
        if let Some(display) = &self.display {
            return display.clone();
        }
        if let Some(segments) = self.rich_segments() {
            return segments.iter().map(|s| s.text.as_str()).collect();
        }
        self.value.raw_display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_format_defaults() {
        let format = CellFormat::default();
        assert!(!format.bold);
        assert!(!format.italic);
        assert!(!format.strikethrough);
        assert_eq!(format.alignment, None);
        assert!(format.is_plain());
    }

    #[test]
    fn test_from_input_number_and_text() {
        let cell = Cell::from_input(" 42 ");
        assert_eq!(cell.value, CellValue::Number(Number::from(42)));
        assert_eq!(cell.display.as_deref(), Some("42"));

        let cell = Cell::from_input("hello");
        assert_eq!(cell.value, CellValue::Text("hello".into()));
        assert_eq!(cell.display.as_deref(), Some("hello"));

        let cell = Cell::from_input("TRUE");
        assert_eq!(cell.value, CellValue::Bool(true));
        assert_eq!(cell.display.as_deref(), Some("TRUE"));

        assert_eq!(Cell::from_input("   "), Cell::new());
    }

    #[test]
    fn test_flags_accept_loose_spellings() {
        let cell: Cell = serde_json::from_value(json!({
            "v": "x", "m": "x", "bl": 1, "it": "1", "cl": true, "ht": "0"
        }))
        .unwrap();
        assert!(cell.format.bold);
        assert!(cell.format.italic);
        assert!(cell.format.strikethrough);
        assert_eq!(cell.format.alignment, Some(Alignment::Center));
    }

    #[test]
    fn test_alignment_codes() {
        assert_eq!(Alignment::from_code(&json!(0)), Some(Alignment::Center));
        assert_eq!(Alignment::from_code(&json!(1)), Some(Alignment::Left));
        assert_eq!(Alignment::from_code(&json!("2")), Some(Alignment::Right));
        assert_eq!(Alignment::from_code(&json!(7)), None);
        assert_eq!(Alignment::from_code(&json!(null)), None);
        assert_eq!(Alignment::Right.code(), 2);
    }

    #[test]
    fn test_unknown_alignment_code_is_kept() {
        let input = json!({ "v": "x", "m": "x", "ht": 7 });
        let cell: Cell = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(cell.format.alignment, None);
        assert_eq!(cell.extra.get("ht"), Some(&json!(7)));
        assert_eq!(serde_json::to_value(&cell).unwrap(), input);

        let known: Cell = serde_json::from_value(json!({ "v": "x", "ht": "2" })).unwrap();
        assert_eq!(known.format.alignment, Some(Alignment::Right));
        assert!(known.extra.get("ht").is_none());
        assert_eq!(serde_json::to_value(&known).unwrap(), json!({ "v": "x", "ht": 2 }));
    }

    #[test]
    fn test_known_alignment_replaces_unknown_code() {
        let mut cell: Cell = serde_json::from_value(json!({ "v": "x", "ht": "top" })).unwrap();
        cell.set_format(CellFormat::aligned(Alignment::Center));
        assert_eq!(serde_json::to_value(&cell).unwrap(), json!({ "v": "x", "ht": 0 }));
    }

    #[test]
    fn test_segment_keeps_unknown_alignment() {
        let segment: RichSegment =
            serde_json::from_value(json!({ "v": "a", "bl": 1, "ht": 9, "fs": 11 })).unwrap();
        assert!(segment.format.bold);
        assert_eq!(segment.extra.get("ht"), Some(&json!(9)));
        assert_eq!(
            serde_json::to_value(&segment).unwrap(),
            json!({ "v": "a", "bl": 1, "ht": 9, "fs": 11 })
        );
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let input = json!({ "v": 1, "m": "1", "fc": "#ff0000", "bl": 0 });
        let cell: Cell = serde_json::from_value(input).unwrap();
        assert_eq!(cell.extra.get("fc"), Some(&json!("#ff0000")));
        assert!(!cell.format.bold);

        let out = serde_json::to_value(&cell).unwrap();
        assert_eq!(out, json!({ "v": 1, "m": "1", "fc": "#ff0000" }));
    }

    #[test]
    fn test_numeric_display_becomes_text() {
        let cell: Cell = serde_json::from_value(json!({ "v": 3, "m": 3 })).unwrap();
        assert_eq!(cell.display.as_deref(), Some("3"));
    }

    #[test]
    fn test_inline_string_detection() {
        let cell = Cell::inline(vec![
            RichSegment::new("a", CellFormat::bold()),
            RichSegment::plain("b"),
        ]);
        assert!(cell.is_inline_string());
        assert!(cell.has_text());
        assert_eq!(cell.rich_segments().map(|s| s.len()), Some(2));
        assert_eq!(cell.plain_text(), "ab");

        let mut not_inline = cell.clone();
        not_inline.kind.as_mut().unwrap().type_code = Some("s".into());
        assert!(not_inline.rich_segments().is_none());
        assert!(!not_inline.has_text());
    }

    #[test]
    fn test_non_scalar_value_is_rejected() {
        let result: Result<Cell, _> = serde_json::from_value(json!({ "v": [1, 2] }));
        assert!(result.is_err());
    }
}
