//! Per-call inputs supplied by the caller.

use crate::types::RequestBody;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Path or query parameters.
///
/// A `BTreeMap` keeps keys sorted, so logically equal parameter sets always
/// serialize identically regardless of insertion order.
pub type Params = BTreeMap<String, Value>;

/// Per-invocation overrides. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub path: Params,
    pub query: Params,
    pub body: Option<RequestBody>,
    pub headers: HashMap<String, String>,
    pub skip_cache: bool,
    /// Page number, applied through the endpoint's pagination policy.
    pub page: Option<u64>,
    /// Page size, applied through the endpoint's pagination policy.
    pub page_size: Option<u64>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path.insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, size: u64) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// Context handed to every interceptor and hook of one call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Unique id of this call, used for log correlation.
    pub request_id: String,
    /// Set by the executor before the pipeline starts.
    pub endpoint_id: Option<String>,
    /// Caller-defined values (e.g. a tenant or auth token).
    pub attributes: HashMap<String, Value>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            endpoint_id: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
