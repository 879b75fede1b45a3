//! Core error types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Status class reported for timeouts.
pub const TIMEOUT_STATUS: u16 = 408;
/// Status class reported when no connection could be made.
pub const NETWORK_STATUS: u16 = 0;
/// Status class reported for unclassified failures.
pub const INTERNAL_STATUS: u16 = 500;

/// Field-level validation errors (field name -> messages).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Discriminant of [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Timeout,
    Network,
    Http,
    Internal,
}

/// Normalized failure of one endpoint call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request did not complete within its timeout.
    #[error("Request timeout: {message}")]
    Timeout { message: String, timeout_ms: u64 },

    /// The request never reached a server.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server responded with a non-2xx status.
    #[error("HTTP error {status}: {message}")]
    Http {
        status: u16,
        message: String,
        errors: Option<FieldErrors>,
        body: Option<serde_json::Value>,
    },

    /// Any failure that fits none of the other kinds.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout {
            message: format!("request timeout after {timeout_ms}ms"),
            timeout_ms,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            errors: None,
            body: None,
        }
    }

    /// HTTP error carrying field errors and the decoded error body.
    pub fn http_with_details(
        status: u16,
        message: impl Into<String>,
        errors: Option<FieldErrors>,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self::Http {
            status,
            message: message.into(),
            errors,
            body,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network { .. } => ErrorKind::Network,
            Self::Http { .. } => ErrorKind::Http,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Numeric status class of the failure.
    pub fn status(&self) -> u16 {
        match self {
            Self::Timeout { .. } => TIMEOUT_STATUS,
            Self::Network { .. } => NETWORK_STATUS,
            Self::Http { status, .. } => *status,
            Self::Internal { .. } => INTERNAL_STATUS,
        }
    }

    /// Human readable message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Timeout { message, .. }
            | Self::Network { message }
            | Self::Http { message, .. }
            | Self::Internal { message } => message,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Http { errors, .. } => errors.as_ref(),
            _ => None,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            Self::Internal { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes_follow_kind() {
        assert_eq!(ApiError::timeout(10).status(), 408);
        assert_eq!(ApiError::network("offline").status(), 0);
        assert_eq!(ApiError::http(422, "invalid").status(), 422);
        assert_eq!(ApiError::internal("boom").status(), 500);
    }

    #[test]
    fn retryable_classification() {
        assert!(ApiError::timeout(10).is_retryable());
        assert!(ApiError::network("reset").is_retryable());
        assert!(ApiError::http(503, "unavailable").is_retryable());
        assert!(ApiError::http(429, "slow down").is_retryable());
        assert!(!ApiError::http(404, "missing").is_retryable());
        assert!(!ApiError::internal("bug").is_retryable());
    }

    #[test]
    fn field_errors_only_on_http() {
        let mut errors = FieldErrors::new();
        errors.insert("email".into(), vec!["is required".into()]);
        let err = ApiError::http_with_details(422, "invalid", Some(errors), None);
        assert_eq!(err.field_errors().unwrap()["email"], vec!["is required"]);
        assert!(ApiError::internal("x").field_errors().is_none());
    }

    #[test]
    fn display_includes_kind() {
        assert_eq!(
            ApiError::http(404, "Not Found").to_string(),
            "HTTP error 404: Not Found"
        );
        assert_eq!(ApiError::timeout(5).message(), "request timeout after 5ms");
    }
}
