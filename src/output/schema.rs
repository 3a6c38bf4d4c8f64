//! Arrow schema inference and JSON to Arrow conversion
//!
//! Rows arrive as JSON objects whose shape may drift from page to page.
//! Columns are ordered by first appearance across all rows, and every
//! column is nullable so a key missing from some rows is a null cell.

use crate::error::{Error, Result};
use crate::types::JsonObject;
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, ListArray, NullArray, StringArray,
    StructArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer};
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered set of named types, merged as values are observed
#[derive(Default)]
struct FieldSet {
    names: Vec<String>,
    types: Vec<DataType>,
    index: HashMap<String, usize>,
}

impl FieldSet {
    fn observe(&mut self, name: &str, data_type: DataType) {
        match self.index.get(name) {
            Some(&i) => self.types[i] = merge_types(&self.types[i], &data_type),
            None => {
                self.index.insert(name.to_string(), self.names.len());
                self.names.push(name.to_string());
                self.types.push(data_type);
            }
        }
    }

    fn into_fields(self) -> Vec<Field> {
        self.names
            .into_iter()
            .zip(self.types)
            .map(|(name, dtype)| Field::new(name, dtype, true))
            .collect()
    }
}

/// Infer an Arrow schema from a set of rows
///
/// Column order follows first appearance: every column of the first row in
/// its key order, then any new column of the second row, and so on.
pub fn infer_schema(rows: &[JsonObject]) -> Schema {
    let mut set = FieldSet::default();

    for row in rows {
        for (key, value) in row {
            set.observe(key, infer_type(value));
        }
    }

    Schema::new(set.into_fields())
}

/// Convert rows to an Arrow RecordBatch
///
/// Uses the provided schema or infers one from the data.
pub fn json_to_arrow(rows: &[JsonObject], schema: Option<&Schema>) -> Result<RecordBatch> {
    let schema = match schema {
        Some(schema) => schema.clone(),
        None => infer_schema(rows),
    };
    let schema = Arc::new(schema);

    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let values: Vec<Option<&Value>> = rows.iter().map(|row| row.get(field.name())).collect();
        columns.push(build_array(&values, field.data_type())?);
    }

    RecordBatch::try_new(schema, columns).map_err(|e| Error::Output {
        message: format!("Failed to create RecordBatch: {e}"),
    })
}

/// Infer Arrow DataType from a JSON value
fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) => {
            if n.is_i64() {
                DataType::Int64
            } else {
                DataType::Float64
            }
        }
        Value::String(_) => DataType::Utf8,
        Value::Array(items) => {
            let item_type = items
                .iter()
                .map(infer_type)
                .reduce(|a, b| merge_types(&a, &b))
                .unwrap_or(DataType::Null);
            list_of(item_type)
        }
        // Parquet cannot store a struct without children
        Value::Object(obj) if obj.is_empty() => DataType::Utf8,
        Value::Object(obj) => {
            let mut set = FieldSet::default();
            for (k, v) in obj {
                set.observe(k, infer_type(v));
            }
            DataType::Struct(Fields::from(set.into_fields()))
        }
    }
}

fn list_of(item_type: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item_type, true)))
}

/// Merge two data types into a compatible type
fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        (a, b) if a == b => a.clone(),

        (DataType::Null, other) | (other, DataType::Null) => other.clone(),

        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }

        (DataType::List(a), DataType::List(b)) => {
            list_of(merge_types(a.data_type(), b.data_type()))
        }

        (DataType::Struct(a), DataType::Struct(b)) => {
            let mut set = FieldSet::default();
            for field in a.iter().chain(b.iter()) {
                set.observe(field.name(), field.data_type().clone());
            }
            DataType::Struct(Fields::from(set.into_fields()))
        }

        // Anything else is kept as text
        _ => DataType::Utf8,
    }
}

/// Build an Arrow array from JSON values
fn build_array(values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Null => Ok(Arc::new(NullArray::new(values.len()))),

        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr: StringArray = values
                .iter()
                .map(|v| match v {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                })
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::List(field) => build_list_array(values, field),

        DataType::Struct(fields) => build_struct_array(values, fields),

        other => Err(Error::output(format!("Unsupported column type {other}"))),
    }
}

/// Build a list array from JSON arrays
fn build_list_array(values: &[Option<&Value>], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut items: Vec<Option<&Value>> = Vec::new();
    let mut offsets: Vec<i32> = Vec::with_capacity(values.len() + 1);
    let mut valid: Vec<bool> = Vec::with_capacity(values.len());
    offsets.push(0);

    for value in values {
        match value {
            Some(Value::Array(arr)) => {
                items.extend(arr.iter().map(Some));
                valid.push(true);
            }
            _ => valid.push(false),
        }
        let offset = i32::try_from(items.len()).map_err(|_| Error::Output {
            message: "Array too large for i32 offset".to_string(),
        })?;
        offsets.push(offset);
    }

    let items_array = build_array(&items, field.data_type())?;
    let list = ListArray::try_new(
        Arc::clone(field),
        OffsetBuffer::new(offsets.into()),
        items_array,
        Some(NullBuffer::from(valid)),
    )?;
    Ok(Arc::new(list))
}

/// Build a struct array from JSON objects
fn build_struct_array(values: &[Option<&Value>], fields: &Fields) -> Result<ArrayRef> {
    let mut children: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let child_values: Vec<Option<&Value>> = values
            .iter()
            .map(|v| match v {
                Some(Value::Object(obj)) => obj.get(field.name()),
                _ => None,
            })
            .collect();
        children.push(build_array(&child_values, field.data_type())?);
    }

    let valid: Vec<bool> = values
        .iter()
        .map(|v| matches!(v, Some(Value::Object(_))))
        .collect();

    let array = StructArray::try_new(fields.clone(), children, Some(NullBuffer::from(valid)))?;
    Ok(Arc::new(array))
}

/// Convert an Arrow RecordBatch back to rows
///
/// Covers the types produced by [`json_to_arrow`]; used to inspect written
/// output.
pub fn arrow_to_json(batch: &RecordBatch) -> Result<Vec<JsonObject>> {
    let schema = batch.schema();
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row_idx in 0..batch.num_rows() {
        let mut row = Map::new();
        for (col_idx, field) in schema.fields().iter().enumerate() {
            let value = array_value_to_json(batch.column(col_idx).as_ref(), row_idx)?;
            row.insert(field.name().clone(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}

fn downcast<'a, T: 'static>(array: &'a dyn Array, name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::output(format!("Failed to downcast to {name}")))
}

/// Convert a single array element to JSON
fn array_value_to_json(array: &dyn Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    match array.data_type() {
        DataType::Null => Ok(Value::Null),

        DataType::Boolean => Ok(Value::Bool(
            downcast::<BooleanArray>(array, "BooleanArray")?.value(row),
        )),

        DataType::Int64 => Ok(Value::Number(
            downcast::<Int64Array>(array, "Int64Array")?.value(row).into(),
        )),

        DataType::Float64 => {
            let val = downcast::<Float64Array>(array, "Float64Array")?.value(row);
            Ok(serde_json::Number::from_f64(val).map_or(Value::Null, Value::Number))
        }

        DataType::Utf8 => Ok(Value::String(
            downcast::<StringArray>(array, "StringArray")?
                .value(row)
                .to_string(),
        )),

        DataType::List(_) => {
            let values = downcast::<ListArray>(array, "ListArray")?.value(row);
            (0..values.len())
                .map(|i| array_value_to_json(values.as_ref(), i))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }

        DataType::Struct(_) => {
            let arr = downcast::<StructArray>(array, "StructArray")?;
            let mut obj = Map::new();
            for (i, field) in arr.fields().iter().enumerate() {
                obj.insert(
                    field.name().clone(),
                    array_value_to_json(arr.column(i).as_ref(), row)?,
                );
            }
            Ok(Value::Object(obj))
        }

        other => Err(Error::output(format!("Unsupported column type {other}"))),
    }
}
