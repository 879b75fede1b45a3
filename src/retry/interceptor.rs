//! Retry interceptor
//!
//! Recovers retryable transport failures by re-sending the request that was
//! on the wire. A successful retry is handed back as `Recovery::Response`, so
//! the executor finishes it like any other response (hooks, mapper, cache).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;

use super::RetryPolicy;
use crate::error::ApiError;
use crate::execution::http::interceptor::{Interceptor, Recovery};
use crate::execution::http::transport::HttpTransport;
use crate::types::{CallContext, RequestDescription};

pub struct RetryInterceptor {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    overrides: HashMap<String, RetryPolicy>,
}

impl RetryInterceptor {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            overrides: HashMap::new(),
        }
    }

    /// Use `policy` instead of the default for calls to `endpoint_id`.
    pub fn with_endpoint_policy(mut self, endpoint_id: impl Into<String>, policy: RetryPolicy) -> Self {
        self.overrides.insert(endpoint_id.into(), policy);
        self
    }

    /// Policy in effect for the call described by `ctx`.
    pub fn policy_for(&self, ctx: &CallContext) -> &RetryPolicy {
        ctx.endpoint_id
            .as_deref()
            .and_then(|id| self.overrides.get(id))
            .unwrap_or(&self.policy)
    }
}

impl std::fmt::Debug for RetryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryInterceptor")
            .field("policy", &self.policy)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Interceptor for RetryInterceptor {
    /// Gives up with `Ok(None)` so later error interceptors still run and the
    /// original error reaches the caller.
    async fn on_error(
        &self,
        error: &ApiError,
        request: Option<&RequestDescription>,
        ctx: &CallContext,
    ) -> Result<Option<Recovery>, ApiError> {
        // Only transport failures carry the request that was sent.
        let Some(request) = request else {
            return Ok(None);
        };
        let policy = self.policy_for(ctx);
        if !policy.allows(error, request.method) {
            return Ok(None);
        }

        for retry in 0..policy.max_attempts.saturating_sub(1) {
            let delay = policy.delay(retry);
            tracing::debug!(target: "apiflow::retry", request_id = %ctx.request_id, retry = retry + 1, delay_ms = delay.as_millis() as u64, "retrying request");
            sleep(delay).await;

            match self.transport.send(request.clone()).await {
                Ok(response) => return Ok(Some(Recovery::Response(response))),
                Err(e) if policy.allows(&e, request.method) => {
                    tracing::debug!(target: "apiflow::retry", request_id = %ctx.request_id, retry = retry + 1, error = %e, "retry failed");
                }
                Err(e) => {
                    tracing::debug!(target: "apiflow::retry", request_id = %ctx.request_id, retry = retry + 1, error = %e, "non-retryable failure, giving up");
                    return Ok(None);
                }
            }
        }
        tracing::warn!(target: "apiflow::retry", request_id = %ctx.request_id, attempts = policy.max_attempts, "retries exhausted");
        Ok(None)
    }
}
