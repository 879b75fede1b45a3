//! TTL cache store over three backends.
//!
//! Expiry is lazy: an expired entry is treated as absent and deleted by the
//! read that finds it. Nothing sweeps in the background.
//!
//! Caching is best-effort. Storage failures are logged and swallowed so a
//! failing cache never fails a request.

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::policy::{CacheBackend, CacheEntry, CachePolicy, DEFAULT_CACHE_PREFIX};
use crate::cache::storage::{KeyValueStorage, MemoryStorage, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

/// Number of prefix-matching entries per backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub process: usize,
    pub durable: usize,
    pub session: usize,
}

/// Cache store owned by one executor.
///
/// Bulk operations (`clear`, `clear_all`, `get_stats`) cover the store
/// prefix plus every policy prefix the store has written under or been told
/// about with [`CacheStore::track_prefix`].
pub struct CacheStore {
    prefix: String,
    tracked: Mutex<BTreeSet<String>>,
    process: Mutex<HashMap<String, CacheEntry>>,
    durable: Arc<dyn KeyValueStorage>,
    session: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    /// Store with in-memory durable and session storages and the system clock.
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            tracked: Mutex::default(),
            process: Mutex::default(),
            durable: Arc::new(MemoryStorage::new()),
            session: Arc::new(MemoryStorage::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Prefix used to discover entries for `clear` and `get_stats`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_durable(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.durable = storage;
        self
    }

    pub fn with_session(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.session = storage;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Include `prefix` in bulk clearing and statistics.
    pub fn track_prefix(&self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if prefix != self.prefix {
            self.tracked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(prefix);
        }
    }

    /// Store prefix first, then tracked policy prefixes.
    pub fn prefixes(&self) -> Vec<String> {
        let tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        std::iter::once(self.prefix.clone())
            .chain(tracked.iter().cloned())
            .collect()
    }

    fn storage(&self, backend: CacheBackend) -> Option<&Arc<dyn KeyValueStorage>> {
        match backend {
            CacheBackend::Process => None,
            CacheBackend::Durable => Some(&self.durable),
            CacheBackend::Session => Some(&self.session),
        }
    }

    fn process_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.process.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read a live value. Missing, expired and unreadable entries are absent.
    pub async fn get(&self, key: &str, policy: &CachePolicy) -> Option<Value> {
        if !policy.enabled {
            return None;
        }
        let full_key = policy.storage_key(key);
        let now = self.clock.now_millis();

        let Some(storage) = self.storage(policy.backend) else {
            let mut map = self.process_map();
            if map.get(&full_key)?.is_expired(now) {
                map.remove(&full_key);
                tracing::debug!(target: "apiflow::cache", key = %full_key, "process entry expired");
                return None;
            }
            return map.get(&full_key).map(|entry| entry.data.clone());
        };

        let raw = match storage.get_item(&full_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(target: "apiflow::cache", backend = ?policy.backend, key = %full_key, error = %e, "cache read failed");
                return None;
            }
        };
        let entry = match serde_json::from_str::<CacheEntry>(&raw).map_err(StorageError::from) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(target: "apiflow::cache", backend = ?policy.backend, key = %full_key, error = %e, "dropping unreadable cache entry");
                self.remove_from(storage.as_ref(), &full_key, policy.backend).await;
                return None;
            }
        };
        if entry.is_expired(now) {
            tracing::debug!(target: "apiflow::cache", backend = ?policy.backend, key = %full_key, "entry expired");
            self.remove_from(storage.as_ref(), &full_key, policy.backend).await;
            return None;
        }
        Some(entry.data)
    }

    /// Store `value` for `policy.ttl_ms`. No-op when the policy is disabled.
    pub async fn set(&self, key: &str, value: Value, policy: &CachePolicy) {
        if !policy.enabled {
            return;
        }
        self.track_prefix(policy.key_prefix.as_str());
        let full_key = policy.storage_key(key);
        let entry = CacheEntry {
            data: value,
            timestamp: self.clock.now_millis(),
            duration: policy.ttl_ms,
        };

        let Some(storage) = self.storage(policy.backend) else {
            self.process_map().insert(full_key, entry);
            return;
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(target: "apiflow::cache", key = %full_key, error = %e, "cache entry not serializable");
                return;
            }
        };
        if let Err(e) = storage.set_item(&full_key, &raw).await {
            tracing::warn!(target: "apiflow::cache", backend = ?policy.backend, key = %full_key, error = %e, "cache write failed");
        }
    }

    pub async fn remove(&self, key: &str, policy: &CachePolicy) {
        let full_key = policy.storage_key(key);
        match self.storage(policy.backend) {
            None => {
                self.process_map().remove(&full_key);
            }
            Some(storage) => self.remove_from(storage.as_ref(), &full_key, policy.backend).await,
        }
    }

    pub async fn has(&self, key: &str, policy: &CachePolicy) -> bool {
        self.get(key, policy).await.is_some()
    }

    /// Remove every entry of `backend` under a known prefix.
    pub async fn clear(&self, backend: CacheBackend) {
        let prefixes = self.prefixes();
        let Some(storage) = self.storage(backend) else {
            let mut map = self.process_map();
            let before = map.len();
            map.retain(|k, _| !has_any_prefix(k, &prefixes));
            let removed = before - map.len();
            tracing::debug!(target: "apiflow::cache", ?backend, removed, "backend cleared");
            return;
        };

        let keys = self.matching_keys(storage.as_ref(), backend, &prefixes).await;
        for key in &keys {
            self.remove_from(storage.as_ref(), key, backend).await;
        }
        tracing::debug!(target: "apiflow::cache", ?backend, removed = keys.len(), "backend cleared");
    }

    pub async fn clear_all(&self) {
        for backend in CacheBackend::ALL {
            self.clear(backend).await;
        }
    }

    /// Remove every entry of `backend` whose full key starts with
    /// `key_prefix`. Returns the number of removed entries.
    pub async fn clear_matching(&self, backend: CacheBackend, key_prefix: &str) -> usize {
        let Some(storage) = self.storage(backend) else {
            let mut map = self.process_map();
            let before = map.len();
            map.retain(|k, _| !k.starts_with(key_prefix));
            return before - map.len();
        };

        let keys = self
            .matching_keys(storage.as_ref(), backend, &[key_prefix.to_string()])
            .await;
        for key in &keys {
            self.remove_from(storage.as_ref(), key, backend).await;
        }
        keys.len()
    }

    /// Count entries under a known prefix per backend. Expired entries that
    /// have not been read yet are still counted.
    pub async fn get_stats(&self) -> CacheStats {
        let prefixes = self.prefixes();
        let process = self
            .process_map()
            .keys()
            .filter(|k| has_any_prefix(k, &prefixes))
            .count();
        CacheStats {
            process,
            durable: self
                .matching_keys(self.durable.as_ref(), CacheBackend::Durable, &prefixes)
                .await
                .len(),
            session: self
                .matching_keys(self.session.as_ref(), CacheBackend::Session, &prefixes)
                .await
                .len(),
        }
    }

    async fn matching_keys(
        &self,
        storage: &dyn KeyValueStorage,
        backend: CacheBackend,
        prefixes: &[String],
    ) -> Vec<String> {
        match storage.keys().await {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| has_any_prefix(k, prefixes))
                .collect(),
            Err(e) => {
                tracing::warn!(target: "apiflow::cache", ?backend, error = %e, "listing cache keys failed");
                Vec::new()
            }
        }
    }

    async fn remove_from(&self, storage: &dyn KeyValueStorage, key: &str, backend: CacheBackend) {
        if let Err(e) = storage.remove_item(key).await {
            tracing::warn!(target: "apiflow::cache", ?backend, key = %key, error = %e, "cache remove failed");
        }
    }
}

fn has_any_prefix(key: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| key.starts_with(p.as_str()))
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("prefixes", &self.prefixes())
            .field("process_entries", &self.process_map().len())
            .finish()
    }
}
