//! Semi-structured JSON records → [`Dataset`]
//!
//! Nested objects are flattened with `.`-joined keys. Columns appear in the
//! order they are first seen across all records; a record missing a column
//! gets null there. Booleans become 1/0 and arrays are kept as JSON text.
//! Two fields of one record flattening to the same name is a `DuplicateColumn`.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use extractflow_protocol::{Dataset, Value};
use serde_json::{Map, Value as JsonValue};

use crate::{Result, SchemaError};

/// Read a JSON array of records, or newline-delimited records.
pub fn read_json_records<R: Read>(mut reader: R) -> Result<Vec<JsonValue>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(&content)?);
    }

    let records = serde_json::Deserializer::from_str(&content)
        .into_iter::<JsonValue>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Flatten records into a dataset with a stable first-seen column order.
pub fn dataset_from_json_records(records: &[JsonValue]) -> Result<Dataset> {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut flattened: Vec<Vec<(usize, Value)>> = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let object = record.as_object().ok_or(SchemaError::InvalidRecord {
            index,
            kind: json_kind(record),
        })?;

        let mut fields = Vec::new();
        flatten_object(object, "", &mut fields);

        let mut cells = Vec::with_capacity(fields.len());
        let mut seen: HashSet<usize> = HashSet::with_capacity(fields.len());
        for (name, value) in fields {
            let position = match positions.get(&name) {
                Some(position) => *position,
                None => {
                    let position = columns.len();
                    positions.insert(name.clone(), position);
                    columns.push(name);
                    position
                }
            };
            // A literal "a.b" key and a nested {"a": {"b": ..}} land on one name.
            if !seen.insert(position) {
                return Err(SchemaError::DuplicateColumn {
                    name: columns[position].clone(),
                });
            }
            cells.push((position, value));
        }
        flattened.push(cells);
    }

    let width = columns.len();
    let mut dataset = Dataset::new(columns);
    for cells in flattened {
        let mut row = vec![Value::Null; width];
        for (position, value) in cells {
            row[position] = value;
        }
        dataset.push_row(row)?;
    }

    tracing::debug!(
        records = records.len(),
        columns = dataset.num_columns(),
        "Normalized JSON records"
    );
    Ok(dataset)
}

fn flatten_object(object: &Map<String, JsonValue>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            JsonValue::Object(nested) if !nested.is_empty() => flatten_object(nested, &name, out),
            other => out.push((name, json_scalar(other))),
        }
    }
}

fn json_scalar(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::Text(value.to_string()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
