#![forbid(unsafe_code)]

use crate::*;
use gl_storage::{ViewStateSaveOutcome, ViewStateSaveRequest};
use serde_json::{Value, json};

impl GridServer {
    /// Skipped with `status: "deferred"` while a bulk load holds the table's
    /// lease.
    pub(crate) fn tool_view_state_save(&mut self, args: Args) -> Value {
        let table_id = match require_string(&args, "tableId") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let state = match require_object(&args, "state") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let state_json = Value::Object(state.clone()).to_string();

        let request = ViewStateSaveRequest {
            table_id: table_id.clone(),
            state_json,
        };
        match self.store.view_state_save(request, now_ms()) {
            Ok(ViewStateSaveOutcome::Saved { updated_at_ms }) => ai_ok(
                "view_state.save",
                json!({
                    "tableId": table_id,
                    "status": "saved",
                    "updatedAt": rfc3339_ms(updated_at_ms),
                }),
            ),
            Ok(ViewStateSaveOutcome::Deferred {
                lease_expires_at_ms,
            }) => ai_ok_with_warnings(
                "view_state.save",
                json!({
                    "tableId": table_id,
                    "status": "deferred",
                    "leaseExpiresAt": rfc3339_ms(lease_expires_at_ms),
                }),
                vec![warning(
                    "BULK_LEASE_LIVE",
                    "a bulk load is running on this table; the view state was not saved",
                )],
            ),
            Err(err) => store_error_envelope(err),
        }
    }

    pub(crate) fn tool_view_state_get(&mut self, args: Args) -> Value {
        let table_id = match require_string(&args, "tableId") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.view_state_get(&table_id) {
            Ok(Some(row)) => {
                let state = serde_json::from_str::<Value>(&row.state_json).unwrap_or(Value::Null);
                ai_ok(
                    "view_state.get",
                    json!({
                        "tableId": table_id,
                        "state": state,
                        "updatedAt": rfc3339_ms(row.updated_at_ms),
                    }),
                )
            }
            Ok(None) => ai_ok(
                "view_state.get",
                json!({ "tableId": table_id, "state": null, "updatedAt": null }),
            ),
            Err(err) => store_error_envelope(err),
        }
    }
}
