//! Interceptor chain
//!
//! Interceptors are named, prioritized handlers that may rewrite an outgoing
//! request, rewrite or replace a decoded response payload, or absorb an
//! error. They are kept in one list sorted ascending by priority (lower runs
//! first); equal priorities keep insertion order.
//!
//! Every phase iterates a snapshot of the list taken when the phase starts,
//! so registering or removing an interceptor affects the next phase to begin,
//! never one already running. Hooks run strictly one after another; each hook
//! sees the previous hook's output.

use crate::error::ApiError;
use crate::types::{CallContext, NormalizedResponse, RequestDescription};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

/// Priority assigned when a registration does not specify one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Synchronous request rewrite hook.
pub type RequestHook = Arc<
    dyn Fn(RequestDescription, &CallContext) -> Result<RequestDescription, ApiError> + Send + Sync,
>;

/// Synchronous payload rewrite hook.
pub type ResponseHook = Arc<dyn Fn(Value, &CallContext) -> Result<Value, ApiError> + Send + Sync>;

/// Synchronous error hook; `Ok(Some(value))` recovers the call.
pub type ErrorHook =
    Arc<dyn Fn(&ApiError, &CallContext) -> Result<Option<Value>, ApiError> + Send + Sync>;

/// How an error hook absorbed a failure.
#[derive(Debug, Clone)]
pub enum Recovery {
    /// Final result of the call, returned to the caller as is.
    Value(Value),
    /// A transport response standing in for the failed one. The executor
    /// finishes it like any other response: response hooks, response chain,
    /// payload mapper and cache write.
    Response(NormalizedResponse),
}

/// Request/response/error interceptor.
///
/// All methods default to pass-through, so an implementation only overrides
/// the phases it participates in.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Rewrite the outgoing request. An error aborts the request phase and is
    /// routed to the error phase.
    async fn on_request(
        &self,
        request: RequestDescription,
        _ctx: &CallContext,
    ) -> Result<RequestDescription, ApiError> {
        Ok(request)
    }

    /// Rewrite or replace the decoded response payload.
    async fn on_response(&self, payload: Value, _ctx: &CallContext) -> Result<Value, ApiError> {
        Ok(payload)
    }

    /// Observe a failure. Returning `Ok(Some(recovery))` recovers the call
    /// and stops the error phase. Returning `Err` aborts recovery and that
    /// error reaches the caller.
    ///
    /// `request` is the request handed to the transport, and is only present
    /// when the transport itself failed.
    async fn on_error(
        &self,
        _error: &ApiError,
        _request: Option<&RequestDescription>,
        _ctx: &CallContext,
    ) -> Result<Option<Recovery>, ApiError> {
        Ok(None)
    }
}

/// Registration input for [`InterceptorChain::register`].
#[derive(Clone)]
pub struct InterceptorRegistration {
    pub name: Option<String>,
    pub priority: Option<i32>,
    pub interceptor: Arc<dyn Interceptor>,
}

impl InterceptorRegistration {
    pub fn new(interceptor: Arc<dyn Interceptor>) -> Self {
        Self {
            name: None,
            priority: None,
            interceptor,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl std::fmt::Debug for InterceptorRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorRegistration")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("interceptor", &"<dyn Interceptor>")
            .finish()
    }
}

/// Name and effective priority of a registered interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorInfo {
    pub name: Option<String>,
    pub priority: i32,
}

#[derive(Clone)]
struct Registered {
    name: Option<String>,
    priority: i32,
    interceptor: Arc<dyn Interceptor>,
}

/// Ordered interceptor list shared by every call of one executor.
#[derive(Default)]
pub struct InterceptorChain {
    entries: RwLock<Vec<Registered>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interceptor.
    ///
    /// A registration whose name is already present replaces the earlier one.
    pub fn register(&self, registration: InterceptorRegistration) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(name) = registration.name.as_deref() {
            entries.retain(|e| e.name.as_deref() != Some(name));
        }
        entries.push(Registered {
            name: registration.name,
            priority: registration.priority.unwrap_or(DEFAULT_PRIORITY),
            interceptor: registration.interceptor,
        });
        // `sort_by_key` is stable: equal priorities keep insertion order.
        entries.sort_by_key(|e| e.priority);
    }

    /// Remove the interceptor registered under `name`. Returns whether one was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|e| e.name.as_deref() != Some(name));
        entries.len() != before
    }

    pub fn list(&self) -> Vec<InterceptorInfo> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| InterceptorInfo {
                name: e.name.clone(),
                priority: e.priority,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn Interceptor>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.interceptor.clone())
            .collect()
    }

    /// Run the request phase.
    pub async fn run_request(
        &self,
        mut request: RequestDescription,
        ctx: &CallContext,
    ) -> Result<RequestDescription, ApiError> {
        for interceptor in self.snapshot() {
            request = interceptor.on_request(request, ctx).await?;
        }
        Ok(request)
    }

    /// Run the response phase.
    pub async fn run_response(
        &self,
        mut payload: Value,
        ctx: &CallContext,
    ) -> Result<Value, ApiError> {
        for interceptor in self.snapshot() {
            payload = interceptor.on_response(payload, ctx).await?;
        }
        Ok(payload)
    }

    /// Run the error phase.
    ///
    /// Returns `Ok(Some(recovery))` as soon as a hook recovers, `Ok(None)`
    /// when no hook did. A failing hook ends the phase with its error.
    pub async fn run_error(
        &self,
        error: &ApiError,
        request: Option<&RequestDescription>,
        ctx: &CallContext,
    ) -> Result<Option<Recovery>, ApiError> {
        for interceptor in self.snapshot() {
            if let Some(recovered) = interceptor.on_error(error, request, ctx).await? {
                return Ok(Some(recovered));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("entries", &self.list())
            .finish()
    }
}

/// Interceptor assembled from synchronous closures.
///
/// ```rust,ignore
/// let auth = HookInterceptor::new().on_request(|mut req, _ctx| {
///     req.headers.insert("authorization", "Bearer t".parse().unwrap());
///     Ok(req)
/// });
/// executor.add_interceptor(InterceptorRegistration::new(Arc::new(auth)).named("auth"));
/// ```
#[derive(Clone, Default)]
pub struct HookInterceptor {
    request: Option<RequestHook>,
    response: Option<ResponseHook>,
    error: Option<ErrorHook>,
}

impl HookInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestDescription, &CallContext) -> Result<RequestDescription, ApiError>
            + Send
            + Sync
            + 'static,
    {
        self.request = Some(Arc::new(hook));
        self
    }

    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value, &CallContext) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        self.response = Some(Arc::new(hook));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApiError, &CallContext) -> Result<Option<Value>, ApiError> + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(hook));
        self
    }
}

#[async_trait]
impl Interceptor for HookInterceptor {
    async fn on_request(
        &self,
        request: RequestDescription,
        ctx: &CallContext,
    ) -> Result<RequestDescription, ApiError> {
        match &self.request {
            Some(hook) => hook(request, ctx),
            None => Ok(request),
        }
    }

    async fn on_response(&self, payload: Value, ctx: &CallContext) -> Result<Value, ApiError> {
        match &self.response {
            Some(hook) => hook(payload, ctx),
            None => Ok(payload),
        }
    }

    async fn on_error(
        &self,
        error: &ApiError,
        _request: Option<&RequestDescription>,
        ctx: &CallContext,
    ) -> Result<Option<Recovery>, ApiError> {
        match &self.error {
            Some(hook) => Ok(hook(error, ctx)?.map(Recovery::Value)),
            None => Ok(None),
        }
    }
}

/// A simple logging interceptor backed by `tracing` (no sensitive data).
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn on_request(
        &self,
        request: RequestDescription,
        ctx: &CallContext,
    ) -> Result<RequestDescription, ApiError> {
        tracing::debug!(target: "apiflow::http", request_id=%ctx.request_id, method=%request.method, url=%request.url, "sending request");
        Ok(request)
    }

    async fn on_response(&self, payload: Value, ctx: &CallContext) -> Result<Value, ApiError> {
        tracing::debug!(target: "apiflow::http", request_id=%ctx.request_id, endpoint=?ctx.endpoint_id, "response received");
        Ok(payload)
    }

    async fn on_error(
        &self,
        error: &ApiError,
        _request: Option<&RequestDescription>,
        ctx: &CallContext,
    ) -> Result<Option<Recovery>, ApiError> {
        tracing::debug!(target: "apiflow::http", request_id=%ctx.request_id, kind=?error.kind(), status=error.status(), err=%error, "request error");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn request() -> RequestDescription {
        RequestDescription {
            url: "http://x/".into(),
            method: HttpMethod::Get,
            headers: HeaderMap::new(),
            body: None,
            timeout: Duration::from_secs(1),
        }
    }

    fn recorder(log: Arc<Mutex<Vec<i32>>>, tag: i32) -> Arc<dyn Interceptor> {
        Arc::new(HookInterceptor::new().on_request(move |req, _| {
            log.lock().unwrap().push(tag);
            Ok(req)
        }))
    }

    #[tokio::test]
    async fn request_phase_runs_in_priority_order() {
        let chain = InterceptorChain::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for p in [50, 10, 100] {
            chain.register(InterceptorRegistration::new(recorder(log.clone(), p)).with_priority(p));
        }
        chain.run_request(request(), &CallContext::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec![10, 50, 100]);
    }

    #[tokio::test]
    async fn equal_priorities_keep_insertion_order() {
        let chain = InterceptorChain::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        chain.register(InterceptorRegistration::new(recorder(log.clone(), 1)));
        chain.register(InterceptorRegistration::new(recorder(log.clone(), 2)).with_priority(5));
        chain.register(InterceptorRegistration::new(recorder(log.clone(), 3)));
        chain.run_request(request(), &CallContext::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec![2, 1, 3]);
        assert_eq!(chain.list()[1].priority, DEFAULT_PRIORITY);
    }

    #[tokio::test]
    async fn each_hook_sees_previous_output() {
        let chain = InterceptorChain::new();
        chain.register(InterceptorRegistration::new(Arc::new(
            HookInterceptor::new().on_request(|mut req, _| {
                req.url.push('a');
                Ok(req)
            }),
        )));
        chain.register(
            InterceptorRegistration::new(Arc::new(HookInterceptor::new().on_request(
                |mut req, _| {
                    req.url.push('b');
                    req.headers.insert("x-seen", HeaderValue::from_static("1"));
                    Ok(req)
                },
            )))
            .with_priority(200),
        );
        let out = chain.run_request(request(), &CallContext::new()).await.unwrap();
        assert_eq!(out.url, "http://x/ab");
        assert!(out.headers.contains_key("x-seen"));
    }

    #[tokio::test]
    async fn response_phase_runs_in_priority_order() {
        let chain = InterceptorChain::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for p in [50, 10, 100] {
            let log = log.clone();
            let hook = HookInterceptor::new().on_response(move |v, _| {
                log.lock().unwrap().push(p);
                Ok(v)
            });
            chain.register(InterceptorRegistration::new(Arc::new(hook)).with_priority(p));
        }
        chain.run_response(json!(null), &CallContext::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec![10, 50, 100]);
    }

    #[tokio::test]
    async fn response_phase_rewrites_payload() {
        let chain = InterceptorChain::new();
        chain.register(InterceptorRegistration::new(Arc::new(
            HookInterceptor::new().on_response(|v, _| Ok(json!({"wrapped": v}))),
        )));
        let out = chain.run_response(json!(1), &CallContext::new()).await.unwrap();
        assert_eq!(out, json!({"wrapped": 1}));
    }

    #[tokio::test]
    async fn first_recovery_stops_error_phase() {
        let chain = InterceptorChain::new();
        let later_ran = Arc::new(Mutex::new(false));
        let flag = later_ran.clone();
        chain.register(
            InterceptorRegistration::new(Arc::new(
                HookInterceptor::new().on_error(|_, _| Ok(Some(json!("fallback")))),
            ))
            .with_priority(1),
        );
        chain.register(InterceptorRegistration::new(Arc::new(
            HookInterceptor::new().on_error(move |_, _| {
                *flag.lock().unwrap() = true;
                Ok(None)
            }),
        )));
        let out = chain
            .run_error(&ApiError::network("down"), None, &CallContext::new())
            .await
            .unwrap();
        assert!(matches!(out, Some(Recovery::Value(v)) if v == json!("fallback")));
        assert!(!*later_ran.lock().unwrap());
    }

    #[tokio::test]
    async fn failing_error_hook_propagates() {
        let chain = InterceptorChain::new();
        chain.register(InterceptorRegistration::new(Arc::new(
            HookInterceptor::new().on_error(|_, _| Err(ApiError::internal("hook failed"))),
        )));
        let err = chain
            .run_error(&ApiError::network("down"), None, &CallContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "hook failed");
    }

    #[test]
    fn unregister_and_replace_by_name() {
        let chain = InterceptorChain::new();
        let it: Arc<dyn Interceptor> = Arc::new(LoggingInterceptor);
        chain.register(InterceptorRegistration::new(it.clone()).named("log").with_priority(5));
        chain.register(InterceptorRegistration::new(it.clone()).named("log").with_priority(7));
        chain.register(InterceptorRegistration::new(it));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.list()[0].priority, 7);

        assert!(chain.unregister("log"));
        assert!(!chain.unregister("log"));
        assert_eq!(chain.len(), 1);

        chain.clear();
        assert!(chain.is_empty());
    }
}
