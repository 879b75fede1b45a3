//! HTTP error handling and normalization utilities
//!
//! Centralizes classification of non-2xx responses so the transport and any
//! custom transport produce the same `ApiError::Http` shape.

use crate::error::{ApiError, FieldErrors};
use crate::types::ResponseBody;
use serde_json::Value;

/// Build an `ApiError::Http` from a decoded error body.
///
/// The message is taken from the first of `message`, `error` (string),
/// `error.message`, `detail` in a JSON body, then a short text body, then
/// the canonical reason phrase. Field errors are read from an `errors` object
/// whose values are a string or an array of strings.
pub fn classify_http_error(
    status: u16,
    body: &ResponseBody,
    fallback_message: Option<&str>,
) -> ApiError {
    let fallback = || {
        fallback_message
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}"))
    };

    match body {
        ResponseBody::Json(json) => {
            let message = message_from_json(json).unwrap_or_else(fallback);
            let errors = field_errors_from_json(json);
            ApiError::http_with_details(status, message, errors, Some(json.clone()))
        }
        ResponseBody::Text(text) => {
            let trimmed = text.trim();
            let message = if trimmed.is_empty() || trimmed.len() > 512 {
                fallback()
            } else {
                trimmed.to_string()
            };
            ApiError::http(status, message)
        }
        ResponseBody::Binary(_) => ApiError::http(status, fallback()),
    }
}

fn message_from_json(json: &Value) -> Option<String> {
    let as_str = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
    as_str(json.get("message"))
        .or_else(|| as_str(json.get("error")))
        .or_else(|| as_str(json.get("error").and_then(|e| e.get("message"))))
        .or_else(|| as_str(json.get("detail")))
}

fn field_errors_from_json(json: &Value) -> Option<FieldErrors> {
    let obj = json.get("errors")?.as_object()?;
    let mut out = FieldErrors::new();
    for (field, value) in obj {
        let messages: Vec<String> = match value {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => continue,
        };
        if !messages.is_empty() {
            out.insert(field.clone(), messages);
        }
    }
    if out.is_empty() { None } else { Some(out) }
}
