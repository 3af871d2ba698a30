#![forbid(unsafe_code)]

use crate::{GridServer, INVALID_REQUEST, JsonRpcRequest, PARSE_ERROR, json_rpc_error};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};

const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Writes one response line. Stdout is locked per line only, so bulk jobs
/// finishing on their own threads never interleave with the request loop.
pub(crate) fn write_response(resp: &Value) -> std::io::Result<()> {
    let line = serde_json::to_string(resp)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()
}

/// Newline-delimited JSON-RPC: one request per line, one response per line.
/// Bulk job responses arrive when the job finishes, possibly after replies to
/// later requests; callers match them by id.
pub(crate) fn run_stdio(server: &mut GridServer) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        if raw.len() > MAX_LINE_BYTES {
            let resp = json_rpc_error(None, INVALID_REQUEST, "Request exceeds max allowed size");
            write_response(&resp)?;
            continue;
        }
        if let Some(resp) = handle_line(server, raw) {
            write_response(&resp)?;
        }
    }

    Ok(())
}

fn handle_line(server: &mut GridServer, raw: &str) -> Option<Value> {
    let data: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return Some(json_rpc_error(None, PARSE_ERROR, &format!("Parse error: {e}"))),
    };

    let (id, has_method) = match data.as_object() {
        Some(obj) => (obj.get("id").cloned(), obj.contains_key("method")),
        None => return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request")),
    };
    if !has_method {
        return Some(json_rpc_error(id, INVALID_REQUEST, "Invalid Request"));
    }

    let request: JsonRpcRequest = match serde_json::from_value(data) {
        Ok(v) => v,
        Err(e) => {
            return Some(json_rpc_error(
                id,
                INVALID_REQUEST,
                &format!("Invalid Request: {e}"),
            ));
        }
    };
    server.handle(request)
}
