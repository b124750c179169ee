//! Lenient serde helpers for the Luckysheet-style wire format.
//!
//! Snapshots written by the browser editor are loose about scalar types:
//! flags show up as `1`, `true` or `"1"`, indices as numbers or numeric
//! strings, display text occasionally as a bare number. Every spelling is
//! accepted on input; output always uses one canonical form.

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

pub fn is_false(value: &bool) -> bool {
    !*value
}

/// Truthiness of a wire scalar.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false")
        }
        _ => false,
    }
}

/// Boolean flags (`bl`, `it`, `cl`), written as `1`.
pub mod flag {
    use super::*;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(truthy(&Value::deserialize(deserializer)?))
    }
}

/// Optional text that may arrive as any scalar.
pub mod text {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(scalar_to_string(Value::deserialize(deserializer)?))
    }
}

/// Required text; null or missing becomes the empty string.
pub mod text_or_empty {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(scalar_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
    }
}

/// Non-negative index that may be a number or a numeric string.
pub mod index {
    use super::*;
    use serde::de::Error;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
        let value = Value::deserialize(deserializer)?;
        parse_index(&value)
            .ok_or_else(|| D::Error::custom(format!("expected a non-negative index, found {value}")))
    }
}

pub fn parse_index(value: &Value) -> Option<usize> {
    match value {
        Value::Null => Some(0),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Value::String(s) if s.trim().is_empty() => Some(0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy_spellings() {
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!("1")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("0")));
        assert!(!truthy(&json!("false")));
        assert!(!truthy(&json!(null)));
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index(&json!(3)), Some(3));
        assert_eq!(parse_index(&json!("2")), Some(2));
        assert_eq!(parse_index(&json!(null)), Some(0));
        assert_eq!(parse_index(&json!("abc")), None);
        assert_eq!(parse_index(&json!([1])), None);
    }
}
