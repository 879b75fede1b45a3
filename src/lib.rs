//! apiflow
//!
//! Declarative endpoint execution: URL building, layered request assembly,
//! prioritized request/response/error interceptors, an injectable HTTP
//! transport, payload mapping, and a TTL cache with process, durable and
//! session backends.
//!
//! ```rust,no_run
//! use apiflow::prelude::*;
//!
//! # async fn demo() -> Result<(), ApiError> {
//! let executor = Executor::builder()
//!     .config(ExecutorConfig::builder().base_url("https://api.example.com").build())
//!     .build()?;
//!
//! executor.register_endpoint(
//!     EndpointDescriptor::builder("users.get", "/users/:id")
//!         .cache(CachePolicy::process(std::time::Duration::from_secs(60)))
//!         .build(),
//! )?;
//!
//! let user = executor
//!     .execute("users.get", CallOptions::new().path("id", 7), CallContext::new())
//!     .await?;
//! # let _ = user;
//! # Ok(()) }
//! ```
#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod execution;
pub mod mapper;
pub mod observability;
pub mod retry;
pub mod types;

pub use error::ApiError;

/// Commonly used types.
pub mod prelude {
    pub use crate::cache::{CacheBackend, CachePolicy, CacheStats, CacheStore};
    pub use crate::config::ExecutorConfig;
    pub use crate::endpoint::{EndpointDescriptor, EndpointGroup, PaginationPolicy};
    pub use crate::error::{ApiError, ErrorKind};
    pub use crate::execution::executor::{Executor, ExecutorBuilder};
    pub use crate::execution::http::interceptor::{
        HookInterceptor, Interceptor, InterceptorRegistration, LoggingInterceptor, Recovery,
    };
    pub use crate::execution::http::transport::{HttpTransport, ReqwestTransport};
    pub use crate::mapper::{FieldRenameMapper, PayloadMapper};
    pub use crate::retry::{RetryInterceptor, RetryPolicy};
    pub use crate::types::{CallContext, CallOptions, HttpMethod, RequestBody, RequestDescription};
}
