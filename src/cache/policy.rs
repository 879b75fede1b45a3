//! Cache policy and entry types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default key prefix; also the prefix used to discover entries for bulk
/// clearing and statistics.
pub const DEFAULT_CACHE_PREFIX: &str = "apiflow_cache_";

/// Where a cached entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process map, cleared only explicitly or on restart.
    #[default]
    Process,
    /// Persistent key/value store (survives restarts when file-backed).
    Durable,
    /// Session-scoped key/value store.
    Session,
}

impl CacheBackend {
    pub const ALL: [CacheBackend; 3] = [Self::Process, Self::Durable, Self::Session];
}

/// Per-endpoint caching policy. Absence on an endpoint means "never cache".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CachePolicy {
    pub enabled: bool,
    pub backend: CacheBackend,
    #[serde(rename = "ttlMillis")]
    pub ttl_ms: u64,
    pub key_prefix: String,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Process,
            ttl_ms: 5 * 60 * 1000,
            key_prefix: DEFAULT_CACHE_PREFIX.to_string(),
        }
    }
}

impl CachePolicy {
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self {
            backend,
            ttl_ms: ttl.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn process(ttl: Duration) -> Self {
        Self::new(CacheBackend::Process, ttl)
    }

    pub fn durable(ttl: Duration) -> Self {
        Self::new(CacheBackend::Durable, ttl)
    }

    pub fn session(ttl: Duration) -> Self {
        Self::new(CacheBackend::Session, ttl)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Full storage key for a cache key.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

/// Stored record. Serialized as `{data, timestamp, duration}` in the
/// persistent backends; the shape must stay stable across versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    /// Write time, epoch milliseconds.
    pub timestamp: i64,
    /// Lifetime in milliseconds.
    pub duration: u64,
}

impl CacheEntry {
    /// Expired once strictly more than `duration` ms have passed since the write.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        // A negative age (clock moved back) counts as fresh.
        u64::try_from(now_ms.saturating_sub(self.timestamp)).is_ok_and(|age| age > self.duration)
    }
}
