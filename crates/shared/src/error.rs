use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the generator on a non-2xx status.
///
/// `detail` is usually a string; request validation failures carry a list of
/// `{ "loc", "msg", "type" }` objects instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: Value,
}

impl ApiErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(text) => text.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item.get("msg").and_then(Value::as_str) {
                    Some(msg) => match item.get("loc").and_then(Value::as_array) {
                        Some(loc) => format!("{}: {msg}", render_loc(loc)),
                        None => msg.to_string(),
                    },
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

fn render_loc(loc: &[Value]) -> String {
    loc.iter()
        .map(|part| match part {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}
