//! Page decoder
//!
//! Turns a data endpoint response body into a [`Page`]. Any deviation from
//! the expected shape is a [`Error::Schema`]: it signals a contract change
//! on the provider side and is never retried.

use super::types::Page;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::JsonObject;
use serde_json::Value;

/// Decoder for nested record containers
#[derive(Debug, Clone)]
pub struct PageDecoder {
    /// Dotted path of the record array
    records_path: String,
    /// Dotted path of the flat row inside each record
    row_path: Option<String>,
    /// Top-level completion flag
    load_complete_field: String,
}

impl Default for PageDecoder {
    fn default() -> Self {
        Self {
            records_path: "root.EmployeeMaster.EmployeeMasterData".to_string(),
            row_path: Some("BasicDetails.BasicDetail".to_string()),
            load_complete_field: "isLoadComplete".to_string(),
        }
    }
}

impl PageDecoder {
    /// Create a decoder reading records directly from `records_path`
    pub fn new(records_path: impl Into<String>) -> Self {
        Self {
            records_path: records_path.into(),
            row_path: None,
            ..Default::default()
        }
    }

    /// Build a decoder from the `api` config section
    pub fn from_config(api: &ApiConfig) -> Self {
        Self {
            records_path: api.records_path.clone(),
            row_path: api.row_path.clone(),
            load_complete_field: api.load_complete_field.clone(),
        }
    }

    /// Set the row path inside each record
    #[must_use]
    pub fn with_row_path(mut self, row_path: impl Into<String>) -> Self {
        self.row_path = Some(row_path.into());
        self
    }

    /// Set the completion flag field
    #[must_use]
    pub fn with_load_complete_field(mut self, field: impl Into<String>) -> Self {
        self.load_complete_field = field.into();
        self
    }

    /// Decode a raw response body
    pub fn decode(&self, body: &str) -> Result<Page> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::schema("$", format!("body is not valid JSON: {e}")))?;
        self.decode_value(&value)
    }

    /// Decode an already parsed response body
    pub fn decode_value(&self, body: &Value) -> Result<Page> {
        let container = resolve_path(body, &self.records_path, &self.records_path)?;
        let Value::Array(items) = container else {
            return Err(Error::schema(
                &self.records_path,
                format!("expected an array, found {}", type_name(container)),
            ));
        };

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            records.push(self.flatten_record(item, idx)?);
        }

        let is_load_complete = match body.get(&self.load_complete_field) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(Error::schema(
                    &self.load_complete_field,
                    format!("expected a boolean, found {}", type_name(other)),
                ))
            }
        };

        Ok(Page::new(records, is_load_complete))
    }

    fn flatten_record(&self, item: &Value, idx: usize) -> Result<JsonObject> {
        let row = match &self.row_path {
            Some(row_path) => {
                let label = format!("{}[{idx}].{row_path}", self.records_path);
                resolve_path(item, row_path, &label)?
            }
            None => item,
        };

        match row {
            Value::Object(obj) => Ok(obj.clone()),
            other => Err(Error::schema(
                format!("{}[{idx}]", self.records_path),
                format!("expected an object row, found {}", type_name(other)),
            )),
        }
    }
}

/// Walk a dotted path (`a.b.c`, optional `$.` prefix) through nested objects
///
/// `label` names the path in the error.
pub fn resolve_path<'a>(value: &'a Value, path: &str, label: &str) -> Result<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let mut current = value;

    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = match current {
            Value::Object(map) => map
                .get(part)
                .ok_or_else(|| Error::schema(label, format!("missing key '{part}'")))?,
            other => {
                return Err(Error::schema(
                    label,
                    format!(
                        "expected an object before '{part}', found {}",
                        type_name(other)
                    ),
                ))
            }
        };
    }

    Ok(current)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
