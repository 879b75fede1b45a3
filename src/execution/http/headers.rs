//! HTTP Headers Utility
//!
//! Layered header merging for request assembly.

use crate::error::ApiError;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::collections::HashMap;

/// Header builder that applies layers in order; later layers override
/// earlier ones by (case-insensitive) name.
pub struct HttpHeaderBuilder {
    headers: HeaderMap,
}

impl HttpHeaderBuilder {
    /// Create a new header builder
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
        }
    }

    /// Add user agent
    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self, ApiError> {
        self.headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| ApiError::internal(format!("Invalid user agent: {e}")))?,
        );
        Ok(self)
    }

    /// Apply one layer of headers, overriding existing values.
    pub fn with_layer(mut self, layer: &HashMap<String, String>) -> Result<Self, ApiError> {
        for (key, value) in layer {
            let (name, value) = parse_header(key, value)?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    /// Build the final HeaderMap
    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

impl Default for HttpHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ApiError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ApiError::internal(format!("Invalid header name '{name}': {e}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| ApiError::internal(format!("Invalid header value for '{name}': {e}")))?;
    Ok((header_name, header_value))
}

/// Content type of a header map, lowercased and without parameters.
pub fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
}

/// Convert reqwest HeaderMap to HashMap<String, String>
///
/// Invalid UTF-8 header values are filtered out.
pub fn headermap_to_hashmap(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v_str| (k.as_str().to_string(), v_str.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_earlier() {
        let defaults = HashMap::from([
            ("Accept".to_string(), "application/json".to_string()),
            ("X-Client".to_string(), "default".to_string()),
        ]);
        let endpoint = HashMap::from([("x-client".to_string(), "endpoint".to_string())]);
        let call = HashMap::from([("X-CLIENT".to_string(), "call".to_string())]);

        let headers = HttpHeaderBuilder::new()
            .with_layer(&defaults)
            .unwrap()
            .with_layer(&endpoint)
            .unwrap()
            .with_layer(&call)
            .unwrap()
            .build();

        assert_eq!(headers.get("x-client").unwrap(), "call");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let bad = HashMap::from([("bad header".to_string(), "v".to_string())]);
        assert!(HttpHeaderBuilder::new().with_layer(&bad).is_err());
    }

    #[test]
    fn content_type_strips_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        assert_eq!(content_type(&headers).as_deref(), Some("application/json"));
    }
}
