//! Response cache.
//!
//! A TTL key/value store with three backends isolated by key prefix:
//! - `Process`: an in-process map
//! - `Durable`: a persistent string store (file-backed when configured)
//! - `Session`: a session-scoped string store
//!
//! Keys come from [`build_cache_key`]; the executor decides when to cache.

mod clock;
mod key;
mod policy;
mod storage;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::build_cache_key;
pub use policy::{CacheBackend, CacheEntry, CachePolicy, DEFAULT_CACHE_PREFIX};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{CacheStats, CacheStore};
