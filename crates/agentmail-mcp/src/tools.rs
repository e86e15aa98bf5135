//! Tool schemas for the four `tools/list` entries this server exposes.
//!
//! Mirrors the CLI one-for-one: `send`, `receive`, `status`,
//! `list-recipients`.

use serde_json::{Value, json};

pub fn tool_schemas() -> Vec<Value> {
    vec![
        send_schema(),
        receive_schema(),
        status_schema(),
        list_recipients_schema(),
    ]
}

fn send_schema() -> Value {
    json!({
        "name": "send",
        "description": "Deliver a message to a recipient window",
        "inputSchema": {
            "type": "object",
            "properties": {
                "recipient": {"type": "string", "description": "Target window name"},
                "message": {"type": "string", "description": "Message body"}
            },
            "required": ["recipient", "message"]
        }
    })
}

fn receive_schema() -> Value {
    json!({
        "name": "receive",
        "description": "Claim the caller's oldest unread message",
        "inputSchema": {
            "type": "object",
            "properties": {}
        }
    })
}

fn status_schema() -> Value {
    json!({
        "name": "status",
        "description": "Declare the caller's availability",
        "inputSchema": {
            "type": "object",
            "properties": {
                "value": {"type": "string", "enum": ["ready", "work", "offline"]}
            },
            "required": ["value"]
        }
    })
}

fn list_recipients_schema() -> Value {
    json!({
        "name": "list-recipients",
        "description": "List addressable windows, marking the caller's own",
        "inputSchema": {
            "type": "object",
            "properties": {}
        }
    })
}
