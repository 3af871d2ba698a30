#![forbid(unsafe_code)]

use gl_core::model::{CellValue, Column, in_creation_order};
use gl_core::search::search_text;
use serde_json::{Map, Value};

pub(crate) fn cell_to_json(value: CellValue) -> Value {
    match value {
        CellValue::Text(text) => Value::String(text),
        CellValue::Number(n) => Value::from(n),
    }
}

/// Text form of a cached cell, `None` for null or missing.
pub(crate) fn render_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Derives the `search` text from a row's cache using the current columns.
pub(crate) fn search_for_cache(columns: &[Column], cache: &Map<String, Value>) -> String {
    let ordered = in_creation_order(columns);
    search_text(
        ordered
            .iter()
            .map(|column| cache.get(&column.id).and_then(render_cell)),
    )
}
