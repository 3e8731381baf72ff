//! Rendering of command responses to the console.

use rpc::{Console, Value};

/// Print a command response. A `batched` invocation (one with a grouped
/// argument) returns a list with one response per expanded command;
/// those are rendered item by item.
pub fn show_response(console: &dyn Console, value: &Value, batched: bool) {
    if batched {
        if let Some(items) = value.as_list() {
            for item in items {
                show_response(console, item, false);
            }
            return;
        }
    }
    match value {
        Value::String(s) => console.show_message(s, true),
        Value::List(items) => {
            for item in items {
                show_response(console, item, false);
            }
        }
        Value::Map(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                console.show_message(&format!("{}: {}", key, render_scalar(&map[key])), true);
            }
        }
        other => console.show_message(&render_scalar(other), true),
    }
}

pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => "<not set>".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        other => format!("{:?}", other),
    }
}
