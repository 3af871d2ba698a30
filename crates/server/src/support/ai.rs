#![forbid(unsafe_code)]

use gl_storage::StoreError;
use serde_json::{Value, json};

pub(crate) fn format_store_error(err: &StoreError) -> String {
    match err {
        StoreError::Io(e) => format!("IO: {e}"),
        StoreError::Sql(e) => format!("SQL: {e}"),
        StoreError::Json(e) => format!("JSON: {e}"),
        StoreError::InvalidInput(msg) => format!("Invalid input: {msg}"),
        StoreError::UnknownTable => "Unknown table".to_string(),
        StoreError::ColumnSetMismatch { expected, supplied } => {
            format!("Column set mismatch: expected={expected} supplied={supplied}")
        }
        StoreError::BatchTimeout {
            batch_index,
            timeout_ms,
        } => format!("Batch timed out: batch={batch_index} timeout_ms={timeout_ms}"),
        StoreError::WorkerPanicked => "Bulk writer panicked".to_string(),
    }
}

fn recovery_hint(err: &StoreError) -> Option<&'static str> {
    match err {
        StoreError::UnknownTable => Some("Create the table with tables.create, then retry."),
        StoreError::ColumnSetMismatch { .. } => {
            Some("Reload the table's columns with tables.columns and retry.")
        }
        StoreError::InvalidInput(msg) if msg.starts_with("RESET_REQUIRED") => {
            Some("Point --storage-dir at an empty directory or remove the old datastore.")
        }
        StoreError::BatchTimeout { .. } | StoreError::WorkerPanicked => {
            Some("Some rows may have been added; call rows.count before retrying.")
        }
        _ => None,
    }
}

pub(crate) fn ai_ok_with_warnings(intent: &str, result: Value, warnings: Vec<Value>) -> Value {
    json!({
        "success": true,
        "intent": intent,
        "result": result,
        "warnings": warnings,
        "refs": [],
        "error": null
    })
}

pub(crate) fn ai_ok(intent: &str, result: Value) -> Value {
    ai_ok_with_warnings(intent, result, Vec::new())
}

pub(crate) fn ai_error_with(code: &str, message: &str, recovery: Option<&str>) -> Value {
    let mut error_obj = serde_json::Map::new();
    error_obj.insert("code".to_string(), Value::String(code.to_string()));
    error_obj.insert(
        "message".to_string(),
        Value::String(message.trim().to_string()),
    );
    if let Some(recovery) = recovery {
        error_obj.insert(
            "recovery".to_string(),
            Value::String(recovery.trim().to_string()),
        );
    }

    json!({
        "success": false,
        "intent": "error",
        "result": {},
        "warnings": [],
        "refs": [],
        "error": Value::Object(error_obj)
    })
}

pub(crate) fn ai_error(code: &str, message: &str) -> Value {
    ai_error_with(code, message, None)
}

pub(crate) fn store_error_envelope(err: StoreError) -> Value {
    ai_error_with(err.code(), &format_store_error(&err), recovery_hint(&err))
}

pub(crate) fn warning(code: &str, message: &str) -> Value {
    json!({ "code": code, "message": message })
}
