use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;

/// A single cell value. Rows arrive loosely typed and are narrowed to this
/// closed set once, so the rest of the pipeline never inspects raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Bool(bool),
    Null,
}

impl ColumnValue {
    /// Infer a value from a raw text cell (CSV input).
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ColumnValue::Null;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return ColumnValue::Number(n);
            }
        }
        match trimmed {
            "true" | "TRUE" | "True" => ColumnValue::Bool(true),
            "false" | "FALSE" | "False" => ColumnValue::Bool(false),
            _ => ColumnValue::Text(raw.to_string()),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => ColumnValue::Null,
            Value::Bool(b) => ColumnValue::Bool(*b),
            Value::Number(n) => match n.as_f64() {
                Some(f) => ColumnValue::Number(f),
                None => ColumnValue::Text(n.to_string()),
            },
            Value::String(s) => ColumnValue::Text(s.clone()),
            other => return Err(anyhow!("Unsupported nested value: {}", other)),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Numeric view of the value. Numeric text parses, booleans do not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Number(n) if n.is_finite() => Some(*n),
            ColumnValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Date view of the value. ISO-8601 text is accepted.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            ColumnValue::Date(d) => Some(*d),
            ColumnValue::Text(s) => parse_date_text(s),
            _ => None,
        }
    }

    /// Stable grouping key; `Null` and the empty string are kept apart.
    pub fn group_key(&self) -> String {
        match self {
            ColumnValue::Null => "\u{0}null".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Number(n) => write!(f, "{}", n),
            ColumnValue::Text(s) => f.write_str(s),
            ColumnValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S")),
            ColumnValue::Bool(b) => write!(f, "{}", b),
            ColumnValue::Null => f.write_str("null"),
        }
    }
}

impl Serialize for ColumnValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColumnValue::Number(n) => serializer.serialize_f64(*n),
            ColumnValue::Text(s) => serializer.serialize_str(s),
            ColumnValue::Date(d) => {
                serializer.serialize_str(&d.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            ColumnValue::Bool(b) => serializer.serialize_bool(*b),
            ColumnValue::Null => serializer.serialize_none(),
        }
    }
}

/// Parse the date shapes that show up in warehouse result sets.
pub fn parse_date_text(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    // Cheap reject before trying every layout
    if s.len() < 8 || !s.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// One result row: column name to value. Never mutated by the engine.
pub type Row = HashMap<String, ColumnValue>;

#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Ordered union of column names, in order of first appearance.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Create a RowSet from a JSON array of objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(array.len());
        for (idx, item) in array.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Row {} is not an object", idx))?;

            let mut row = Row::with_capacity(obj.len());
            for (key, raw) in obj {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
                let value = ColumnValue::from_json(raw)
                    .with_context(|| format!("Row {}, field '{}'", idx, key))?;
                row.insert(key.clone(), value);
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Create a RowSet from CSV with a header line
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
            let row: Row = columns
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| (header.clone(), ColumnValue::infer(cell)))
                .collect();
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }
}
