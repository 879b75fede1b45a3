//! Retries
//!
//! - policy.rs: attempt budget, idempotency gate and capped backoff
//! - interceptor.rs: error-phase interceptor that re-sends failed requests

mod interceptor;
mod policy;

pub use interceptor::RetryInterceptor;
pub use policy::RetryPolicy;
