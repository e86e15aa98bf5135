//! Tool dispatch: each call is a thin wrapper over `MailOps`, returning
//! the same fields the CLI prints to stdout.

use agentmail_core::{AtmError, MailOps, Multiplexer};
use serde_json::{Value, json};

pub fn call<M: Multiplexer>(ops: &MailOps<M>, name: &str, arguments: &Value) -> Result<Value, AtmError> {
    match name {
        "send" => send(ops, arguments),
        "receive" => receive(ops),
        "status" => status(ops, arguments),
        "list-recipients" => list_recipients(ops),
        other => Err(AtmError::RecipientNotFound {
            recipient: format!("unknown tool '{other}'"),
        }),
    }
}

fn send<M: Multiplexer>(ops: &MailOps<M>, arguments: &Value) -> Result<Value, AtmError> {
    let recipient = arguments
        .get("recipient")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = arguments
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let id = ops.send(recipient, message)?;
    Ok(json!({ "id": id }))
}

fn receive<M: Multiplexer>(ops: &MailOps<M>) -> Result<Value, AtmError> {
    match ops.receive(chrono::Utc::now())? {
        Some(msg) => Ok(serde_json::to_value(msg).expect("ReceivedMessage always serializes")),
        None => Ok(json!({ "status": "No unread messages" })),
    }
}

fn status<M: Multiplexer>(ops: &MailOps<M>, arguments: &Value) -> Result<Value, AtmError> {
    let value = arguments
        .get("value")
        .and_then(Value::as_str)
        .unwrap_or_default();
    ops.set_status(value, chrono::Utc::now())?;
    Ok(json!({ "ok": true }))
}

fn list_recipients<M: Multiplexer>(ops: &MailOps<M>) -> Result<Value, AtmError> {
    let recipients = ops.list_recipients()?;
    Ok(json!({ "recipients": recipients }))
}
