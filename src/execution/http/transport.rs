//! HTTP transport abstraction.
//!
//! The executor hands a fully resolved [`RequestDescription`] to an injectable
//! transport. [`ReqwestTransport`] is the default; tests and embedders can
//! provide their own implementation to observe the final URL/headers/body and
//! return a synthetic response.
//!
//! Every failure is normalized into one of the four [`ApiError`] kinds. The
//! transport never retries.

use crate::error::ApiError;
use crate::execution::errors::classify_http_error;
use crate::execution::http::headers::{content_type, headermap_to_hashmap};
use crate::types::{FormPart, NormalizedResponse, RequestBody, RequestDescription, ResponseBody};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};

/// Performs the network call for one request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: RequestDescription) -> Result<NormalizedResponse, ApiError>;
}

/// reqwest-backed transport.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxy, TLS, pooling...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn dispatch(&self, request: RequestDescription) -> Result<NormalizedResponse, ApiError> {
        let timeout_ms = request.timeout_ms();
        let RequestDescription {
            url,
            method,
            mut headers,
            body,
            ..
        } = request;

        let body = match body {
            Some(RequestBody::Json(value)) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(PreparedBody::Bytes(Bytes::from(serde_json::to_vec(&value)?)))
            }
            Some(RequestBody::Binary(bytes)) => Some(PreparedBody::Bytes(bytes)),
            Some(RequestBody::Multipart(parts)) => {
                // reqwest sets the boundary-bearing content type itself.
                headers.remove(CONTENT_TYPE);
                Some(PreparedBody::Form(build_form(parts)?))
            }
            None => None,
        };

        let mut rb = self.client.request(method.into(), &url).headers(headers);
        rb = match body {
            Some(PreparedBody::Bytes(bytes)) => rb.body(bytes),
            Some(PreparedBody::Form(form)) => rb.multipart(form),
            None => rb,
        };

        tracing::debug!(target: "apiflow::http", %method, %url, "sending request");
        let resp = rb
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout_ms))?;

        let status = resp.status();
        let response_headers = resp.headers().clone();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout_ms))?;
        let body = decode_body(content_type(&response_headers).as_deref(), bytes);

        tracing::debug!(target: "apiflow::http", %method, %url, status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(classify_http_error(
                status.as_u16(),
                &body,
                status.canonical_reason(),
            ));
        }

        Ok(NormalizedResponse {
            status: status.as_u16(),
            headers: headermap_to_hashmap(&response_headers),
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: RequestDescription) -> Result<NormalizedResponse, ApiError> {
        let timeout = request.timeout;
        let timeout_ms = request.timeout_ms();
        // Dropping the in-flight future on expiry cancels the request.
        match tokio::time::timeout(timeout, self.dispatch(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(target: "apiflow::http", timeout_ms, "request timed out");
                Err(ApiError::timeout(timeout_ms))
            }
        }
    }
}

enum PreparedBody {
    Bytes(Bytes),
    Form(reqwest::multipart::Form),
}

fn build_form(parts: Vec<FormPart>) -> Result<reqwest::multipart::Form, ApiError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                filename,
                mime,
                data,
            } => {
                let mut file = reqwest::multipart::Part::bytes(data.to_vec()).file_name(filename);
                if let Some(mime) = mime {
                    file = file
                        .mime_str(&mime)
                        .map_err(|e| ApiError::internal(format!("Invalid MIME type '{mime}': {e}")))?;
                }
                form.part(name, file)
            }
        };
    }
    Ok(form)
}

/// Decode a response body by content type.
///
/// JSON content types are parsed (an unparseable body falls back to text),
/// `text/*` and XML become text, everything else stays binary. An empty body
/// decodes to JSON `null`.
pub fn decode_body(content_type: Option<&str>, bytes: Bytes) -> ResponseBody {
    if bytes.is_empty() {
        return ResponseBody::Json(serde_json::Value::Null);
    }
    match content_type {
        Some(ct) if ct.contains("json") => match serde_json::from_slice(&bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(e) => {
                tracing::debug!(target: "apiflow::http", error = %e, "JSON body did not parse, keeping text");
                ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
        },
        Some(ct) if ct.starts_with("text/") || ct.contains("xml") || ct.contains("javascript") => {
            ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        Some(_) => ResponseBody::Binary(bytes),
        None => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => ResponseBody::Text(text),
            Err(_) => ResponseBody::Binary(bytes),
        },
    }
}
