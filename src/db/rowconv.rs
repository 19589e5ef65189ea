// ABOUTME: Converts a driver-agnostic sqlx::any::AnyRow into a JSON object
// ABOUTME: Dispatches by column type name since Any erases the concrete backend type

use serde_json::{Map, Value};
use sqlx::any::AnyRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Column name plus the JSON-ish type label reported in
/// `ResultMetadata::column_types` (spec §4.9).
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
}

#[must_use]
pub fn column_metadata(row: &AnyRow) -> Vec<ColumnMeta> {
    row.columns()
        .iter()
        .map(|c| ColumnMeta {
            name: c.name().to_owned(),
            type_name: c.type_info().name().to_owned(),
        })
        .collect()
}

/// Decode every column of `row` into a JSON object keyed by column name.
///
/// `sqlx::any` erases the concrete backend, so there is no single decode
/// path that works for every driver; this tries the family of Rust types
/// that cover the SQL types used in practice (int/float/bool/string/bytes)
/// and falls back to `null` for anything that does not decode, rather than
/// failing the whole row.
#[must_use]
pub fn row_to_json(row: &AnyRow) -> Value {
    let mut obj = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx);
        obj.insert(column.name().to_owned(), value);
    }
    Value::Object(obj)
}

fn decode_column(row: &AnyRow, idx: usize) -> Value {
    if let Ok(raw) = row.try_get_raw(idx) {
        if raw.is_null() {
            return Value::Null;
        }
    }

    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<i32, _>(idx) {
        return Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<bool, _>(idx) {
        return Value::Bool(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number);
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Value::String(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
        use base64::Engine;
        return Value::String(base64::engine::general_purpose::STANDARD.encode(v));
    }

    Value::Null
}
