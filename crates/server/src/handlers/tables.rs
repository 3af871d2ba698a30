#![forbid(unsafe_code)]

use crate::*;
use gl_core::model::{Column, ColumnType};
use gl_storage::{ColumnSpec, TableCreateRequest};
use serde_json::{Value, json};

pub(super) fn column_json(column: &Column) -> Value {
    json!({
        "id": column.id,
        "name": column.name,
        "type": column.column_type.as_str(),
        "creationOrder": column.creation_order,
    })
}

fn parse_column_spec(index: usize, value: &Value) -> Result<ColumnSpec, Value> {
    let Some(obj) = value.as_object() else {
        return Err(ai_error(
            "INVALID_INPUT",
            &format!("columns[{index}] must be an object"),
        ));
    };
    let name = require_string(obj, "name")
        .map_err(|_| ai_error("INVALID_INPUT", &format!("columns[{index}].name is required")))?;
    let column_type = match optional_string(obj, "type")? {
        None => ColumnType::Text,
        Some(raw) => ColumnType::parse(&raw).map_err(|err| {
            ai_error("INVALID_INPUT", &format!("columns[{index}].type: {err}"))
        })?,
    };
    Ok(ColumnSpec { name, column_type })
}

impl GridServer {
    pub(crate) fn tool_tables_create(&mut self, args: Args) -> Value {
        let name = match require_string(&args, "name") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let columns = match args.get("columns") {
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                let raw = match require_array(&args, "columns") {
                    Ok(v) => v,
                    Err(resp) => return resp,
                };
                let mut out = Vec::with_capacity(raw.len());
                for (index, value) in raw.iter().enumerate() {
                    match parse_column_spec(index, value) {
                        Ok(spec) => out.push(spec),
                        Err(resp) => return resp,
                    }
                }
                out
            }
        };

        match self.store.table_create(TableCreateRequest { name, columns }) {
            Ok(table) => ai_ok(
                "tables.create",
                json!({
                    "tableId": table.id,
                    "name": table.name,
                    "columns": table.columns.iter().map(column_json).collect::<Vec<_>>(),
                    "createdAt": rfc3339_ms(table.created_at_ms),
                }),
            ),
            Err(err) => store_error_envelope(err),
        }
    }

    pub(crate) fn tool_tables_columns(&mut self, args: Args) -> Value {
        let table_id = match require_string(&args, "tableId") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.table_columns(&table_id) {
            Ok(columns) => ai_ok(
                "tables.columns",
                json!({
                    "tableId": table_id,
                    "columns": columns.iter().map(column_json).collect::<Vec<_>>(),
                }),
            ),
            Err(err) => store_error_envelope(err),
        }
    }
}
