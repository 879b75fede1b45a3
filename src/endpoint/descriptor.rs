//! Endpoint descriptors.

use crate::cache::CachePolicy;
use crate::error::ApiError;
use crate::execution::http::interceptor::{RequestHook, ResponseHook};
use crate::mapper::PayloadMapper;
use crate::types::{CallContext, HttpMethod, Params, RequestDescription};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// How page/size call options become query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationPolicy {
    pub page_param: String,
    pub size_param: String,
    pub default_size: Option<u64>,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            page_param: "page".to_string(),
            size_param: "pageSize".to_string(),
            default_size: None,
        }
    }
}

impl PaginationPolicy {
    pub fn with_default_size(mut self, size: u64) -> Self {
        self.default_size = Some(size);
        self
    }

    /// Insert page/size into `query` unless the caller set them explicitly.
    pub fn apply(&self, query: &mut Params, page: Option<u64>, page_size: Option<u64>) {
        if let Some(page) = page {
            query
                .entry(self.page_param.clone())
                .or_insert_with(|| Value::from(page));
        }
        if let Some(size) = page_size.or(self.default_size) {
            query
                .entry(self.size_param.clone())
                .or_insert_with(|| Value::from(size));
        }
    }
}

/// Static description of one callable operation.
///
/// Built once with [`EndpointDescriptor::builder`] and then registered; the
/// executor shares it read-only between calls.
#[derive(Clone)]
pub struct EndpointDescriptor {
    pub id: String,
    /// URL template with `:name` / `:name?` placeholders.
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    /// Falls back to the executor default when unset.
    pub timeout: Option<Duration>,
    pub cache: Option<CachePolicy>,
    pub pagination: Option<PaginationPolicy>,
    pub mapper: Option<Arc<dyn PayloadMapper>>,
    pub before_request: Option<RequestHook>,
    pub after_response: Option<ResponseHook>,
}

impl EndpointDescriptor {
    pub fn builder(id: impl Into<String>, url: impl Into<String>) -> EndpointDescriptorBuilder {
        EndpointDescriptorBuilder::new(id, url)
    }

    /// Cache policy, only when present and enabled.
    pub fn active_cache(&self) -> Option<&CachePolicy> {
        self.cache.as_ref().filter(|p| p.enabled)
    }
}

impl std::fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers.len())
            .field("timeout", &self.timeout)
            .field("cache", &self.cache)
            .field("pagination", &self.pagination)
            .field("has_mapper", &self.mapper.is_some())
            .field("has_before_request", &self.before_request.is_some())
            .field("has_after_response", &self.after_response.is_some())
            .finish()
    }
}

/// Builder for [`EndpointDescriptor`].
pub struct EndpointDescriptorBuilder {
    descriptor: EndpointDescriptor,
}

impl EndpointDescriptorBuilder {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            descriptor: EndpointDescriptor {
                id: id.into(),
                url: url.into(),
                method: HttpMethod::Get,
                headers: HashMap::new(),
                timeout: None,
                cache: None,
                pagination: None,
                mapper: None,
                before_request: None,
                after_response: None,
            },
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.descriptor.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.timeout = Some(timeout);
        self
    }

    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.descriptor.cache = Some(policy);
        self
    }

    pub fn pagination(mut self, policy: PaginationPolicy) -> Self {
        self.descriptor.pagination = Some(policy);
        self
    }

    pub fn mapper(mut self, mapper: Arc<dyn PayloadMapper>) -> Self {
        self.descriptor.mapper = Some(mapper);
        self
    }

    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestDescription, &CallContext) -> Result<RequestDescription, ApiError>
            + Send
            + Sync
            + 'static,
    {
        self.descriptor.before_request = Some(Arc::new(hook));
        self
    }

    pub fn after_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value, &CallContext) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        self.descriptor.after_response = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> EndpointDescriptor {
        self.descriptor
    }
}

/// Serializable subset of an endpoint descriptor, for configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub cache: Option<CachePolicy>,
    #[serde(default)]
    pub pagination: Option<PaginationPolicy>,
}

impl From<EndpointConfig> for EndpointDescriptor {
    fn from(config: EndpointConfig) -> Self {
        let mut builder = EndpointDescriptor::builder(config.id, config.url).method(config.method);
        builder.descriptor.headers = config.headers;
        builder.descriptor.timeout = config.timeout_ms.map(Duration::from_millis);
        builder.descriptor.cache = config.cache;
        builder.descriptor.pagination = config.pagination;
        builder.build()
    }
}
