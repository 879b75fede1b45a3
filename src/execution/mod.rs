//! Request execution pipeline.
//!
//! `executor` orchestrates one call: cache lookup, request assembly,
//! payload mapping, interceptors, transport and cache write.

pub mod errors;
pub mod executor;
pub mod http;
pub mod request;
