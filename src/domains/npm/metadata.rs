//! Normalizers for package fields whose shape varies between packages.
//!
//! None of these fail: unrecognized shapes degrade to an empty value.

use serde_json::Value;

/// `"MIT"` or `{"type": "MIT"}`.
pub fn license(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// `"https://..."` or `{"type": "git", "url": "git+https://....git"}`.
pub fn repository(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("url").and_then(Value::as_str) {
            Some(url) => {
                let url = url.strip_prefix("git+").unwrap_or(url);
                url.strip_suffix(".git").unwrap_or(url).to_string()
            }
            None => String::new(),
        },
        _ => String::new(),
    }
}

/// `"Jane <jane@example.com>"` or `{"name": ..., "email": ...}`.
pub fn author(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            // `"name": ""` counts as missing, so it never renders as " <email>".
            let field = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            };
            match (field("name"), field("email")) {
                (Some(name), Some(email)) => format!("{} <{}>", name, email),
                (Some(name), None) => name.to_string(),
                (None, Some(email)) => email.to_string(),
                (None, None) => String::new(),
            }
        }
        _ => String::new(),
    }
}

/// `["a", "b"]`, or a legacy comma-separated `"a, b"`.
pub fn keywords(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
