//! Decoding of seed files into typed rows.
//!
//! Every entity declares a `#[derive(Deserialize)]` row that mirrors the file's
//! column names. CSV rows and JSON objects both go through `serde_json::Value`
//! before reaching the row type, so the [`loose`] field helpers see a single
//! representation: CSV cells stay text (no `007` → `7` inference) and JSON keeps
//! its numbers. Structural problems (broken CSV framing, JSON that is not an
//! array of objects) fail the whole file.

use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
}

pub fn decode<T: DeserializeOwned>(
    format: SourceFormat,
    key: &str,
    bytes: &[u8],
) -> Result<Vec<T>> {
    let text = std::str::from_utf8(bytes).map_err(|_| ImportError::Utf8 {
        key: key.to_string(),
    })?;
    // Spreadsheet exports often start with a byte-order mark.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let objects = match format {
        SourceFormat::Csv => csv_objects(key, text)?,
        SourceFormat::Json => json_objects(key, text)?,
    };

    objects
        .into_iter()
        .map(|fields| {
            serde_json::from_value(Value::Object(fields)).map_err(|source| ImportError::Json {
                key: key.to_string(),
                source,
            })
        })
        .collect()
}

fn csv_objects(key: &str, text: &str) -> Result<Vec<Map<String, Value>>> {
    let csv_err = |source| ImportError::Csv {
        key: key.to_string(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut objects = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let fields = headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| (header.clone(), Value::String(value.to_string())))
            .collect();
        objects.push(fields);
    }
    Ok(objects)
}

fn json_objects(key: &str, text: &str) -> Result<Vec<Map<String, Value>>> {
    let shape_err = || ImportError::JsonShape {
        key: key.to_string(),
    };

    let value: Value = serde_json::from_str(text).map_err(|source| ImportError::Json {
        key: key.to_string(),
        source,
    })?;
    let Value::Array(items) = value else {
        return Err(shape_err());
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(fields) => Ok(fields),
            _ => Err(shape_err()),
        })
        .collect()
}

/// `deserialize_with` helpers for seed columns. None of them fail on content:
/// a value that cannot be coerced becomes `None` and the entity builder decides
/// whether the row survives. Pair every use with `#[serde(default)]` so absent
/// columns are accepted too.
pub mod loose {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Trimmed, non-empty text. Numbers and booleans are rendered as text,
    /// nested arrays and objects as compact JSON.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(value_text(Value::deserialize(deserializer)?))
    }

    /// Integer from a JSON number or numeric text; fractional values truncate.
    pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(value_int(&Value::deserialize(deserializer)?))
    }

    /// Like [`int`], with absent or non-numeric values read as zero.
    pub fn int_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(value_int(&Value::deserialize(deserializer)?).unwrap_or(0))
    }

    fn value_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
            Value::Null => None,
        }
    }

    fn value_int(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
            _ => None,
        }
    }
}
