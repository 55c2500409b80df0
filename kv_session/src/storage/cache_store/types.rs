use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;

pub(super) struct CacheEntry {
    pub(super) value: Vec<u8>,
    pub(super) expires_at: Instant,
}

/// Process-local store. Values disappear with the process.
pub struct InMemoryCacheStore {
    pub(super) entry: Mutex<HashMap<String, CacheEntry>>,
    pub(super) next_sweep: Mutex<Instant>,
}

/// Store backed by a redis server.
pub struct RedisCacheStore {
    pub(super) client: redis::Client,
}

/// Key-value capability a session backend has to provide.
///
/// Implementations must be safe to call from concurrently handled requests.
/// Every method is a single best-effort operation: there is no transaction
/// spanning calls and the last writer to a key wins.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StorageError>;

    /// Read the raw bytes stored under `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, expiring after `ttl` seconds.
    async fn put_with_ttl(&self, key: &str, value: Vec<u8>, ttl: u64)
    -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
