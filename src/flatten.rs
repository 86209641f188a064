//! Flattening of nested JSON rows into dotted column keys.

use serde_json::{Map, Value};

use crate::error::StructuralError;

/// One row with nested objects merged into `parent.child` keys.
pub type FlatRow = Map<String, Value>;

/// Maximum number of nested object levels a row may have.
pub const MAX_DEPTH: usize = 64;

/// Column key used when a row is not a JSON object.
pub const SCALAR_ROW_KEY: &str = "value";

/// Flatten one row.
///
/// Nested objects are merged into the result under `"{key}.{child}"`. Arrays, scalars and
/// nulls are leaves and are copied unchanged. A row that is not an object becomes a single
/// [`SCALAR_ROW_KEY`] entry.
pub fn flatten(row: &Value) -> Result<FlatRow, StructuralError> {
    let mut out = Map::new();
    match row {
        Value::Object(obj) => flatten_into(obj, None, 1, &mut out)?,
        other => {
            out.insert(SCALAR_ROW_KEY.to_string(), other.clone());
        }
    }
    Ok(out)
}

/// Flatten every row, stopping at the first structural error.
pub fn flatten_rows(rows: &[Value]) -> Result<Vec<FlatRow>, StructuralError> {
    rows.iter().map(flatten).collect()
}

fn flatten_into(
    obj: &Map<String, Value>,
    prefix: Option<&str>,
    depth: usize,
    out: &mut FlatRow,
) -> Result<(), StructuralError> {
    if depth > MAX_DEPTH {
        return Err(StructuralError {
            path: prefix.unwrap_or_default().to_string(),
            max_depth: MAX_DEPTH,
        });
    }
    for (key, value) in obj {
        let full_key = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(child) => flatten_into(child, Some(&full_key), depth + 1, out)?,
            leaf => {
                out.insert(full_key, leaf.clone());
            }
        }
    }
    Ok(())
}
