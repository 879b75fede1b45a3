//! Tracing setup.
//!
//! The library only emits `tracing` events (targets `apiflow::executor`,
//! `apiflow::http`, `apiflow::cache`, `apiflow::retry`). Applications that
//! have no subscriber of their own can install one with [`init_tracing`].

use crate::error::ApiError;
use tracing_subscriber::EnvFilter;

/// Subscriber options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub default_directive: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_directive: "apiflow=info".to_string(),
            json: false,
        }
    }
}

impl TracingConfig {
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, ApiError> {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(filter) if !filter.trim().is_empty() => EnvFilter::try_new(filter),
            _ => EnvFilter::try_new(&self.default_directive),
        }
        .map_err(|e| ApiError::internal(format!("invalid tracing filter: {e}")))
    }
}

/// Install a global `fmt` subscriber. Fails if one is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), ApiError> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| ApiError::internal(format!("failed to install tracing subscriber: {e}")))
}
