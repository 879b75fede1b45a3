//! Executor configuration.
//!
//! Global defaults applied to every endpoint of one executor. Loadable from
//! JSON; every field has a default.

use crate::cache::DEFAULT_CACHE_PREFIX;
use crate::endpoint::EndpointConfig;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutorConfig {
    /// Base URL for relative endpoint templates.
    pub base_url: String,
    /// Lowest-precedence header layer.
    pub default_headers: HashMap<String, String>,
    pub default_timeout_ms: u64,
    pub user_agent: Option<String>,
    /// Prefix used to discover cache entries for clearing and statistics.
    pub cache_prefix: String,
    /// Directory of the durable cache backend; in-memory when unset.
    pub durable_cache_dir: Option<PathBuf>,
    /// Endpoints registered when the executor is built.
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_headers: HashMap::new(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: None,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            durable_cache_dir: None,
            endpoints: Vec::new(),
        }
    }
}

impl ExecutorConfig {
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ApiError> {
        serde_json::from_str(json)
            .map_err(|e| ApiError::internal(format!("invalid executor configuration: {e}")))
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

/// Builder for [`ExecutorConfig`].
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.cache_prefix = prefix.into();
        self
    }

    pub fn durable_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.durable_cache_dir = Some(dir.into());
        self
    }

    pub fn endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.config.endpoints.push(endpoint);
        self
    }

    pub fn build(self) -> ExecutorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = ExecutorConfig::from_json_str(r#"{"baseUrl": "https://api.example.com"}"#).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.default_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.cache_prefix, DEFAULT_CACHE_PREFIX);
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn parses_endpoints() {
        let config = ExecutorConfig::from_json_str(
            r#"{
                "defaultHeaders": {"accept": "application/json"},
                "endpoints": [{"id": "users.create", "url": "/users", "method": "POST"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.endpoints[0].method, crate::types::HttpMethod::Post);
        assert_eq!(config.default_headers["accept"], "application/json");
    }

    #[test]
    fn invalid_json_is_internal_error() {
        let err = ExecutorConfig::from_json_str("{").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }

    #[test]
    fn builder_sets_fields() {
        let config = ExecutorConfig::builder()
            .base_url("http://x")
            .header("x-app", "demo")
            .timeout(Duration::from_secs(2))
            .build();
        assert_eq!(config.default_timeout(), Duration::from_secs(2));
        assert_eq!(config.default_headers["x-app"], "demo");
    }
}
