//! Record Types
//! Raw CSV rows as handed over by ingestion, and their typed, normalized form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One parsed CSV row: column name to raw cell text.
///
/// Nothing is guaranteed about a raw record. Columns may be missing, blank or malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    cells: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for tests and JSON-free callers.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Cell text, trimmed. Blank cells read as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Always finite.
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

/// A row after schema coercion. Only fields declared in the schema are present,
/// and every present value has the declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    values: HashMap<&'static str, Value>,
}

impl NormalizedRecord {
    pub(crate) fn set(&mut self, field: &'static str, value: Value) {
        self.values.insert(field, value);
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.values.get(field) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Owned text, or `fallback` when the field is absent.
    pub fn text_or(&self, field: &str, fallback: &str) -> String {
        self.text(field).unwrap_or(fallback).to_string()
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        match self.values.get(field) {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.values.get(field) {
            Some(Value::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_read_as_missing() {
        let raw = RawRecord::new().with("Customer", "  ").with("Sales", " 12 ");
        assert_eq!(raw.get("Customer"), None);
        assert_eq!(raw.get("Sales"), Some("12"));
        assert_eq!(raw.get("Product"), None);
    }

    #[test]
    fn raw_record_deserializes_from_flat_json_object() {
        let raw: RawRecord = serde_json::from_str(r#"{"Customer":"X","Sales":"100"}"#).unwrap();
        assert_eq!(raw.get("Customer"), Some("X"));
        assert_eq!(raw.len(), 2);
    }
}
