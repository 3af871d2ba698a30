#![forbid(unsafe_code)]

use crate::*;
use serde_json::{Value, json};

impl GridServer {
    pub(crate) fn tool_lease_check(&mut self, args: Args) -> Value {
        let table_id = match require_string(&args, "tableId") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        match self.store.lease_check(&table_id, now_ms()) {
            Ok(status) => ai_ok(
                "lease.check",
                json!({
                    "tableId": table_id,
                    "isLocked": status.is_locked,
                    "expiresAt": status.expires_at_ms.map(rfc3339_ms),
                    "expiresAtMs": status.expires_at_ms,
                    "remainingMs": status.remaining_ms,
                }),
            ),
            Err(err) => store_error_envelope(err),
        }
    }
}
