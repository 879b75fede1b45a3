//! Error Handling Module
//!
//! Every failure that leaves the transport, the payload mapper or an
//! interceptor has one of four shapes:
//! - `Timeout`: the request exceeded its deadline
//! - `Network`: the request never reached a server (status 0)
//! - `Http`: the server answered with a non-2xx status
//! - `Internal`: anything else (status 500)
//!
//! # Example
//!
//! ```rust,ignore
//! use apiflow::error::{ApiError, ErrorKind};
//!
//! let error = ApiError::http(404, "Not found");
//! assert_eq!(error.kind(), ErrorKind::Http);
//! assert!(!error.is_retryable());
//! ```

// Module declarations
mod conversions;
pub mod types;

// Re-exports for public API
pub use types::*;
