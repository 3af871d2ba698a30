#![forbid(unsafe_code)]

mod lease;
mod rows;
mod tables;
mod view_state;

use crate::{Args, GridServer};
use serde_json::Value;

/// Answered by a background job rather than by [`dispatch`].
pub(crate) const BULK_METHOD: &str = "rows.generate_bulk";

pub(crate) const METHODS: &[&str] = &[
    "tables.create",
    "tables.columns",
    BULK_METHOD,
    "rows.page",
    "rows.count",
    "lease.check",
    "view_state.save",
    "view_state.get",
];

pub(crate) fn dispatch(server: &mut GridServer, method: &str, args: Args) -> Option<Value> {
    let body = match method {
        "tables.create" => server.tool_tables_create(args),
        "tables.columns" => server.tool_tables_columns(args),
        "rows.page" => server.tool_rows_page(args),
        "rows.count" => server.tool_rows_count(args),
        "lease.check" => server.tool_lease_check(args),
        "view_state.save" => server.tool_view_state_save(args),
        "view_state.get" => server.tool_view_state_get(args),
        _ => return None,
    };
    Some(body)
}
