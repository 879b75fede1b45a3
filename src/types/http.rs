//! HTTP-level request and response types.
//!
//! `RequestDescription` is the only thing a transport ever sees; it is built
//! once per call and rewritten by interceptors and hooks on the way out.

use crate::error::ApiError;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Only GET results are eligible for caching.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Get)
    }

    /// Mutations whose body goes through the payload mapper.
    pub fn is_body_bearing(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Methods that are safe to send more than once.
    pub fn is_idempotent(self) -> bool {
        !matches!(self, Self::Post | Self::Patch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mime: Option<String>,
        data: Bytes,
    },
}

/// Request body.
///
/// `Json` is serialized by the transport and is the only variant the payload
/// mapper transforms. `Binary` and `Multipart` leave the content type to the
/// transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Binary(Bytes),
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Fully resolved request.
#[derive(Debug, Clone)]
pub struct RequestDescription {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub timeout: Duration,
}

impl RequestDescription {
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    Binary(Bytes),
}

impl ResponseBody {
    /// Convert into the JSON payload that flows through the pipeline.
    ///
    /// Text becomes a JSON string and binary content a base64 JSON string.
    pub fn into_payload(self) -> serde_json::Value {
        match self {
            Self::Json(v) => v,
            Self::Text(s) => serde_json::Value::String(s),
            Self::Binary(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(&b))
            }
        }
    }
}

/// Successful transport outcome.
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    pub status: u16,
    /// Response headers (lowercased keys).
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl NormalizedResponse {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: ResponseBody::Json(value),
        }
    }

    /// Decode a JSON body into `T`.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, ApiError> {
        match &self.body {
            ResponseBody::Json(v) => Ok(serde_json::from_value(v.clone())?),
            ResponseBody::Text(s) => Ok(serde_json::from_str(s)?),
            ResponseBody::Binary(_) => Err(ApiError::internal("binary response is not JSON")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_classes() {
        assert!(HttpMethod::Get.is_read_only());
        assert!(!HttpMethod::Post.is_read_only());
        assert!(HttpMethod::Patch.is_body_bearing());
        assert!(!HttpMethod::Delete.is_body_bearing());
        assert!(HttpMethod::Delete.is_idempotent());
        assert!(!HttpMethod::Post.is_idempotent());
        assert_eq!(serde_json::to_value(HttpMethod::Put).unwrap(), json!("PUT"));
    }

    #[test]
    fn payload_conversion() {
        assert_eq!(ResponseBody::Text("hi".into()).into_payload(), json!("hi"));
        assert_eq!(
            ResponseBody::Binary(Bytes::from_static(b"abc")).into_payload(),
            json!("YWJj")
        );
    }
}
