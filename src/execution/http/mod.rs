//! HTTP Utilities
//!
//! This module contains HTTP-related building blocks:
//! - URL building
//! - Header layering
//! - Interceptor chain
//! - Transport

pub mod headers;
pub mod interceptor;
pub mod transport;
pub mod url;

// Re-export main types
pub use interceptor::{
    DEFAULT_PRIORITY, HookInterceptor, Interceptor, InterceptorChain, InterceptorInfo,
    InterceptorRegistration, LoggingInterceptor, Recovery,
};
pub use transport::{HttpTransport, ReqwestTransport};
pub use url::build_url;
