//! agentmail-mcp - stdio JSON-RPC 2.0 front-end exposing `send`, `receive`,
//! `status`, and `list-recipients` as MCP tools.
//!
//! Framing is newline-delimited JSON, one request or response per line.
//! There is no child process to proxy and no Content-Length framing to
//! negotiate, so a single synchronous read/dispatch/write loop is enough.

mod handlers;
mod tools;

use agentmail_core::{AtmError, MailOps, StoreLayout, TmuxMultiplexer};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};

fn main() {
    agentmail_core::logging::init();

    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let layout = StoreLayout::discover(&cwd);
    let ops = MailOps::new(layout, TmuxMultiplexer);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                write_line(&mut stdout, &parse_error_response(&e.to_string()));
                continue;
            }
        };

        if let Some(response) = handle_request(&ops, &request) {
            write_line(&mut stdout, &response);
        }
    }
}

/// Returns `None` for notifications (no `id`), which get no response per
/// JSON-RPC 2.0.
fn handle_request<M: agentmail_core::Multiplexer>(
    ops: &MailOps<M>,
    request: &Value,
) -> Option<Value> {
    let id = request.get("id").cloned();
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");

    let result = match method {
        "initialize" => Ok(json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": { "name": "agentmail-mcp", "version": env!("CARGO_PKG_VERSION") },
            "capabilities": { "tools": {} }
        })),
        "tools/list" => Ok(json!({ "tools": tools::tool_schemas() })),
        "tools/call" => {
            let name = request
                .pointer("/params/name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let empty = json!({});
            let arguments = request.pointer("/params/arguments").unwrap_or(&empty);
            handlers::call(ops, name, arguments)
        }
        _ => Err(AtmError::RecipientNotFound {
            recipient: format!("unknown method '{method}'"),
        }),
    };

    let id = id?;
    Some(match result {
        Ok(value) => json!({ "jsonrpc": "2.0", "id": id, "result": value }),
        Err(e) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": e.to_string() }
        }),
    })
}

fn parse_error_response(message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": Value::Null,
        "error": { "code": -32700, "message": format!("parse error: {message}") }
    })
}

fn write_line(out: &mut impl Write, value: &Value) {
    if let Ok(line) = serde_json::to_string(value) {
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}
