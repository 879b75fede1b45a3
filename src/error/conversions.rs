//! Conversions from platform errors into normalized errors.

use super::ApiError;

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(format!("JSON error: {err}"))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(format!("IO error: {err}"))
    }
}

impl ApiError {
    /// Classify a reqwest failure.
    ///
    /// `timeout_ms` is reported when reqwest itself gave up on a deadline.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ApiError::timeout(timeout_ms)
        } else if err.is_connect() || err.is_request() {
            ApiError::network(err.to_string())
        } else {
            ApiError::internal(err.to_string())
        }
    }
}
