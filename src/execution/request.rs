//! Request config assembler.
//!
//! Merges executor defaults, the endpoint descriptor and per-call options
//! into one [`RequestDescription`].

use crate::config::ExecutorConfig;
use crate::endpoint::EndpointDescriptor;
use crate::error::ApiError;
use crate::execution::http::headers::HttpHeaderBuilder;
use crate::execution::http::url::build_url;
use crate::types::{CallOptions, Params, RequestDescription};

/// Query parameters of a call after applying the endpoint's pagination policy.
pub fn resolve_query(endpoint: &EndpointDescriptor, options: &CallOptions) -> Params {
    let mut query = options.query.clone();
    if let Some(pagination) = &endpoint.pagination {
        pagination.apply(&mut query, options.page, options.page_size);
    }
    query
}

/// Build the request description of one call.
///
/// Headers are layered `user agent < config defaults < endpoint < call`,
/// each layer overriding the previous one by name. The timeout is the
/// endpoint's, or the configured default.
pub fn assemble_request(
    config: &ExecutorConfig,
    endpoint: &EndpointDescriptor,
    options: &CallOptions,
    query: &Params,
) -> Result<RequestDescription, ApiError> {
    let url = build_url(&config.base_url, &endpoint.url, &options.path, query);

    let mut headers = HttpHeaderBuilder::new();
    if let Some(user_agent) = &config.user_agent {
        headers = headers.with_user_agent(user_agent)?;
    }
    let headers = headers
        .with_layer(&config.default_headers)?
        .with_layer(&endpoint.headers)?
        .with_layer(&options.headers)?
        .build();

    Ok(RequestDescription {
        url,
        method: endpoint.method,
        headers,
        body: options.body.clone(),
        timeout: endpoint.timeout.unwrap_or_else(|| config.default_timeout()),
    })
}
