//! Shared request/response types.

mod call;
mod http;

pub use call::*;
pub use http::*;
