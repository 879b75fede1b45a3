//! Executor
//!
//! Orchestrates one call through the pipeline:
//!
//! ```text
//! CacheCheck -> Build -> MapRequest -> RequestIntercept -> Transport
//!            -> ResponseIntercept -> MapResponse -> CacheWrite -> Done
//! ```
//!
//! Any failure from `Build` onward enters the error phase of the interceptor
//! chain, which either recovers the call or lets the normalized error reach
//! the caller. A recovered value is returned as is; a recovered response is
//! finished from `ResponseIntercept` onward and cached like any other.
//!
//! Each executor owns its cache store, interceptor chain and endpoint
//! registry; there is no process-wide default instance.

use crate::cache::{
    CacheStore, Clock, DEFAULT_CACHE_PREFIX, FileStorage, KeyValueStorage, MemoryStorage,
    build_cache_key,
};
use crate::config::ExecutorConfig;
use crate::endpoint::{EndpointDescriptor, EndpointGroup, EndpointRegistry};
use crate::error::ApiError;
use crate::execution::http::interceptor::{
    InterceptorChain, InterceptorRegistration, LoggingInterceptor, Recovery, RequestHook,
    ResponseHook,
};
use crate::execution::http::transport::{HttpTransport, ReqwestTransport};
use crate::execution::request::{assemble_request, resolve_query};
use crate::mapper::{map_to_entity, map_to_wire};
use crate::types::{
    CallContext, CallOptions, NormalizedResponse, Params, RequestBody, RequestDescription,
};
use serde_json::Value;
use std::sync::Arc;

/// Priority of the built-in logging interceptor; runs after user interceptors.
pub const LOGGING_PRIORITY: i32 = 1000;

pub struct Executor {
    config: ExecutorConfig,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<CacheStore>,
    interceptors: Arc<InterceptorChain>,
    endpoints: EndpointRegistry,
    global_before_request: Option<RequestHook>,
    global_after_response: Option<ResponseHook>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("base_url", &self.config.base_url)
            .field("endpoints", &self.endpoints.ids())
            .field("interceptors", &self.interceptors.len())
            .field("has_global_before_request", &self.global_before_request.is_some())
            .field("has_global_after_response", &self.global_after_response.is_some())
            .finish()
    }
}

impl Executor {
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Transport used for every call (e.g. to build a `RetryInterceptor`).
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        self.transport.clone()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Register an endpoint. A cache policy still on the default key prefix
    /// is moved to the configured `cache_prefix`.
    pub fn register_endpoint(&self, descriptor: EndpointDescriptor) -> Result<(), ApiError> {
        let descriptor = adopt_cache_prefix(descriptor, &self.config.cache_prefix, &self.cache);
        let descriptor = self.endpoints.register(descriptor)?;
        tracing::debug!(target: "apiflow::executor", endpoint = %descriptor.id, "endpoint registered");
        Ok(())
    }

    /// Register every endpoint of `group`; returns the registered ids.
    pub fn register_group(&self, group: EndpointGroup) -> Result<Vec<String>, ApiError> {
        let name = group.name().to_string();
        let descriptors = group
            .into_endpoints()
            .into_iter()
            .map(|d| adopt_cache_prefix(d, &self.config.cache_prefix, &self.cache))
            .collect();
        let ids = self.endpoints.register_all(descriptors)?;
        tracing::debug!(target: "apiflow::executor", group = %name, count = ids.len(), "endpoint group registered");
        Ok(ids)
    }

    pub fn endpoint(&self, id: &str) -> Option<Arc<EndpointDescriptor>> {
        self.endpoints.get(id)
    }

    pub fn endpoint_ids(&self) -> Vec<String> {
        self.endpoints.ids()
    }

    pub fn add_interceptor(&self, registration: InterceptorRegistration) {
        self.interceptors.register(registration);
    }

    pub fn remove_interceptor(&self, name: &str) -> bool {
        self.interceptors.unregister(name)
    }

    /// Clear cached results of one endpoint, or of everything when `None`.
    ///
    /// `None` covers the configured prefix and every prefix used by a
    /// registered or previously cached policy.
    pub async fn clear_cache(&self, endpoint_id: Option<&str>) {
        let Some(id) = endpoint_id else {
            self.cache.clear_all().await;
            return;
        };
        let Some(policy) = self.endpoints.get(id).and_then(|e| e.cache.clone()) else {
            return;
        };
        let prefix = policy.storage_key(&format!("{id}:"));
        let removed = self.cache.clear_matching(policy.backend, &prefix).await;
        tracing::debug!(target: "apiflow::executor", endpoint = %id, removed, "endpoint cache cleared");
    }

    /// Execute a registered endpoint.
    ///
    /// GET calls on endpoints with an enabled cache policy are served from
    /// and written to the cache unless `options.skip_cache` is set.
    /// Concurrent calls sharing a cache key are not deduplicated: both may
    /// miss, both reach the network and the last write wins.
    pub async fn execute(
        &self,
        endpoint_id: &str,
        options: CallOptions,
        ctx: CallContext,
    ) -> Result<Value, ApiError> {
        let endpoint = self
            .endpoints
            .get(endpoint_id)
            .ok_or_else(|| ApiError::internal(format!("unknown endpoint '{endpoint_id}'")))?;
        self.execute_endpoint(&endpoint, options, ctx).await
    }

    /// Execute and deserialize the final payload.
    pub async fn execute_as<T: serde::de::DeserializeOwned>(
        &self,
        endpoint_id: &str,
        options: CallOptions,
        ctx: CallContext,
    ) -> Result<T, ApiError> {
        let value = self.execute(endpoint_id, options, ctx).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Execute a descriptor that need not be registered.
    pub async fn execute_endpoint(
        &self,
        endpoint: &EndpointDescriptor,
        options: CallOptions,
        mut ctx: CallContext,
    ) -> Result<Value, ApiError> {
        ctx.endpoint_id = Some(endpoint.id.clone());
        let query = resolve_query(endpoint, &options);

        let cache_policy = endpoint
            .active_cache()
            .filter(|_| endpoint.method.is_read_only() && !options.skip_cache);
        let cache_key = cache_policy.map(|_| build_cache_key(&endpoint.id, &options.path, &query));

        if let (Some(policy), Some(key)) = (cache_policy, cache_key.as_deref()) {
            if let Some(hit) = self.cache.get(key, policy).await {
                tracing::debug!(target: "apiflow::executor", request_id = %ctx.request_id, endpoint = %endpoint.id, "cache hit");
                return Ok(hit);
            }
            tracing::debug!(target: "apiflow::executor", request_id = %ctx.request_id, endpoint = %endpoint.id, "cache miss");
        }

        let payload = match self.run_pipeline(endpoint, &options, &query, &ctx).await {
            Ok(payload) => payload,
            Err(failure) => match self.recover(endpoint, failure, &ctx).await? {
                Recovered::Final(value) => return Ok(value),
                Recovered::Finished(payload) => payload,
            },
        };

        if let (Some(policy), Some(key)) = (cache_policy, cache_key.as_deref()) {
            self.cache.set(key, payload.clone(), policy).await;
        }
        Ok(payload)
    }

    async fn run_pipeline(
        &self,
        endpoint: &EndpointDescriptor,
        options: &CallOptions,
        query: &Params,
        ctx: &CallContext,
    ) -> Result<Value, Failure> {
        let request = self
            .prepare_request(endpoint, options, query, ctx)
            .await
            .map_err(Failure::pipeline)?;

        // Transport
        let response = match self.transport.send(request.clone()).await {
            Ok(response) => response,
            Err(error) => {
                return Err(Failure {
                    error,
                    sent: Some(request),
                });
            }
        };

        self.finish_response(endpoint, response, ctx)
            .await
            .map_err(Failure::pipeline)
    }

    /// Build, MapRequest and RequestIntercept.
    async fn prepare_request(
        &self,
        endpoint: &EndpointDescriptor,
        options: &CallOptions,
        query: &Params,
        ctx: &CallContext,
    ) -> Result<RequestDescription, ApiError> {
        let mut request = assemble_request(&self.config, endpoint, options, query)?;

        if let Some(mapper) = &endpoint.mapper
            && endpoint.method.is_body_bearing()
        {
            request.body = match request.body.take() {
                Some(RequestBody::Json(body)) => {
                    Some(RequestBody::Json(map_to_wire(mapper.as_ref(), body)?))
                }
                other => other,
            };
        }

        // Chain, legacy global hook, endpoint hook.
        request = self.interceptors.run_request(request, ctx).await?;
        if let Some(hook) = &self.global_before_request {
            request = hook(request, ctx)?;
        }
        if let Some(hook) = &endpoint.before_request {
            request = hook(request, ctx)?;
        }
        Ok(request)
    }

    /// ResponseIntercept and MapResponse.
    async fn finish_response(
        &self,
        endpoint: &EndpointDescriptor,
        response: NormalizedResponse,
        ctx: &CallContext,
    ) -> Result<Value, ApiError> {
        let mut payload = response.body.into_payload();

        // Endpoint hook, legacy global hook, chain.
        if let Some(hook) = &endpoint.after_response {
            payload = hook(payload, ctx)?;
        }
        if let Some(hook) = &self.global_after_response {
            payload = hook(payload, ctx)?;
        }
        payload = self.interceptors.run_response(payload, ctx).await?;

        if let Some(mapper) = &endpoint.mapper {
            payload = map_to_entity(mapper.as_ref(), payload)?;
        }
        Ok(payload)
    }

    /// Error phase. A failing error hook aborts recovery and its error wins.
    /// A recovered response that fails to finish is not sent through the
    /// error phase again; its error reaches the caller.
    async fn recover(
        &self,
        endpoint: &EndpointDescriptor,
        failure: Failure,
        ctx: &CallContext,
    ) -> Result<Recovered, ApiError> {
        let Failure { error, sent } = failure;
        tracing::debug!(target: "apiflow::executor", request_id = %ctx.request_id, endpoint = ?ctx.endpoint_id, kind = ?error.kind(), status = error.status(), "call failed");
        match self.interceptors.run_error(&error, sent.as_ref(), ctx).await? {
            Some(Recovery::Value(value)) => {
                tracing::debug!(target: "apiflow::executor", request_id = %ctx.request_id, "call recovered with a value");
                Ok(Recovered::Final(value))
            }
            Some(Recovery::Response(response)) => {
                tracing::debug!(target: "apiflow::executor", request_id = %ctx.request_id, status = response.status, "call recovered with a response");
                Ok(Recovered::Finished(
                    self.finish_response(endpoint, response, ctx).await?,
                ))
            }
            None => Err(error),
        }
    }
}

/// A failed pipeline run. `sent` is set only when the transport failed.
struct Failure {
    error: ApiError,
    sent: Option<RequestDescription>,
}

impl Failure {
    fn pipeline(error: ApiError) -> Self {
        Self { error, sent: None }
    }
}

enum Recovered {
    /// Returned as is, never cached.
    Final(Value),
    /// Finished like a normal response and cached like one.
    Finished(Value),
}

/// Move a default-prefixed cache policy onto `prefix` and make the store
/// aware of the policy's prefix.
fn adopt_cache_prefix(
    mut descriptor: EndpointDescriptor,
    prefix: &str,
    cache: &CacheStore,
) -> EndpointDescriptor {
    if let Some(policy) = descriptor.cache.as_mut() {
        if policy.key_prefix == DEFAULT_CACHE_PREFIX {
            policy.key_prefix = prefix.to_string();
        }
        cache.track_prefix(policy.key_prefix.as_str());
    }
    descriptor
}

/// Builder for [`Executor`].
#[derive(Default)]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    http_client: Option<reqwest::Client>,
    durable: Option<Arc<dyn KeyValueStorage>>,
    session: Option<Arc<dyn KeyValueStorage>>,
    clock: Option<Arc<dyn Clock>>,
    interceptors: Vec<InterceptorRegistration>,
    global_before_request: Option<RequestHook>,
    global_after_response: Option<ResponseHook>,
    http_debug: bool,
}

impl ExecutorBuilder {
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Custom transport; takes precedence over `http_client`.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Custom reqwest client for the default transport.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Durable backend storage; overrides `durable_cache_dir`.
    pub fn durable_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.durable = Some(storage);
        self
    }

    pub fn session_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.session = Some(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn interceptor(mut self, registration: InterceptorRegistration) -> Self {
        self.interceptors.push(registration);
        self
    }

    /// Legacy hook run after the whole request-phase chain.
    pub fn global_before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestDescription, &CallContext) -> Result<RequestDescription, ApiError>
            + Send
            + Sync
            + 'static,
    {
        self.global_before_request = Some(Arc::new(hook));
        self
    }

    /// Legacy hook run before the whole response-phase chain.
    pub fn global_after_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value, &CallContext) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        self.global_after_response = Some(Arc::new(hook));
        self
    }

    /// Register the built-in logging interceptor.
    pub fn http_debug(mut self, enabled: bool) -> Self {
        self.http_debug = enabled;
        self
    }

    pub fn build(self) -> Result<Executor, ApiError> {
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(ReqwestTransport::with_client(
                self.http_client.unwrap_or_default(),
            ))
        });

        let durable: Arc<dyn KeyValueStorage> = match (self.durable, &self.config.durable_cache_dir) {
            (Some(storage), _) => storage,
            (None, Some(dir)) => Arc::new(FileStorage::new(dir.clone())),
            (None, None) => Arc::new(MemoryStorage::new()),
        };
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let mut cache = CacheStore::new()
            .with_prefix(self.config.cache_prefix.clone())
            .with_durable(durable)
            .with_session(session);
        if let Some(clock) = self.clock {
            cache = cache.with_clock(clock);
        }

        let interceptors = InterceptorChain::new();
        for registration in self.interceptors {
            interceptors.register(registration);
        }
        if self.http_debug {
            interceptors.register(
                InterceptorRegistration::new(Arc::new(LoggingInterceptor))
                    .named("logging")
                    .with_priority(LOGGING_PRIORITY),
            );
        }

        let endpoints = EndpointRegistry::new();
        for endpoint in self.config.endpoints.iter().cloned() {
            endpoints.register(adopt_cache_prefix(
                endpoint.into(),
                &self.config.cache_prefix,
                &cache,
            ))?;
        }

        Ok(Executor {
            config: self.config,
            transport,
            cache: Arc::new(cache),
            interceptors: Arc::new(interceptors),
            endpoints,
            global_before_request: self.global_before_request,
            global_after_response: self.global_after_response,
        })
    }
}
