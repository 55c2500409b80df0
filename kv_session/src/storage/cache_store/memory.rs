use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::storage::errors::StorageError;

use super::types::{CacheEntry, CacheStore, InMemoryCacheStore};

/// Minimum time between sweeps of expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Longest TTL honoured. Larger values are treated as this one.
const MAX_TTL: Duration = Duration::from_secs(u32::MAX as u64);

impl InMemoryCacheStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session cache store");
        Self {
            entry: Mutex::new(HashMap::new()),
            next_sweep: Mutex::new(Instant::now() + SWEEP_INTERVAL),
        }
    }

    /// Drop every expired entry, at most once per `SWEEP_INTERVAL`.
    async fn sweep_expired(&self, entries: &mut HashMap<String, CacheEntry>, now: Instant) {
        let mut next_sweep = self.next_sweep.lock().await;
        if now < *next_sweep {
            return;
        }
        *next_sweep = now + SWEEP_INTERVAL;

        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!("Swept {} expired session entries", evicted);
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut entries = self.entry.lock().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                tracing::trace!("Evicting expired entry: {}", key);
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(ttl).min(MAX_TTL);

        let mut entries = self.entry.lock().await;
        self.sweep_expired(&mut entries, now).await;
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entry.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_init() {
        // Given an in-memory cache store
        let store = InMemoryCacheStore::new();

        // When initializing it
        let result = store.init().await;

        // Then it should succeed
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_put_and_get() {
        // Given an in-memory cache store
        let store = InMemoryCacheStore::new();

        // When putting a value
        let put_result = store
            .put_with_ttl("session_abc", b"{\"a\":1}".to_vec(), 60)
            .await;
        assert!(put_result.is_ok());

        // Then it should be returned by get
        let retrieved = store.get("session_abc").await.unwrap();
        assert_eq!(retrieved.as_deref(), Some(&b"{\"a\":1}"[..]));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let store = InMemoryCacheStore::new();

        let retrieved = store.get("session_missing").await.unwrap();

        assert!(retrieved.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent_and_is_evicted() {
        // Given an entry whose expiry is already in the past
        let store = InMemoryCacheStore::new();
        store.entry.lock().await.insert(
            "session_old".to_string(),
            CacheEntry {
                value: b"{}".to_vec(),
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );

        // When reading it
        let retrieved = store.get("session_old").await.unwrap();

        // Then it is absent and no longer held
        assert!(retrieved.is_none());
        assert!(store.entry.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_put_sweeps_expired_entries_never_read_again() {
        // Given an abandoned expired entry and a sweep that is due
        let store = InMemoryCacheStore::new();
        store.entry.lock().await.insert(
            "session_abandoned".to_string(),
            CacheEntry {
                value: b"{}".to_vec(),
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );
        *store.next_sweep.lock().await = Instant::now();

        // When an unrelated session is written
        store.put_with_ttl("session_live", b"{}".to_vec(), 60).await.unwrap();

        // Then only the live entry is still held
        let entries = store.entry.lock().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("session_live"));
    }

    #[tokio::test]
    async fn test_put_skips_sweep_within_interval() {
        let store = InMemoryCacheStore::new();
        store.entry.lock().await.insert(
            "session_abandoned".to_string(),
            CacheEntry {
                value: b"{}".to_vec(),
                expires_at: Instant::now() - Duration::from_secs(1),
            },
        );

        store.put_with_ttl("session_live", b"{}".to_vec(), 60).await.unwrap();

        assert_eq!(store.entry.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_put_with_huge_ttl_is_kept() {
        let store = InMemoryCacheStore::new();

        store.put_with_ttl("k", b"v".to_vec(), u64::MAX).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_overwrite_existing_key() {
        let store = InMemoryCacheStore::new();

        store.put_with_ttl("k", b"old".to_vec(), 60).await.unwrap();
        store.put_with_ttl("k", b"new".to_vec(), 60).await.unwrap();

        let retrieved = store.get("k").await.unwrap().unwrap();
        assert_eq!(retrieved, b"new".to_vec());
    }

    #[tokio::test]
    async fn test_remove() {
        // Given a stored value
        let store = InMemoryCacheStore::new();
        store.put_with_ttl("k", b"v".to_vec(), 60).await.unwrap();

        // When removing it
        let remove_result = store.remove("k").await;

        // Then it is gone
        assert!(remove_result.is_ok());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_nonexistent_key() {
        let store = InMemoryCacheStore::new();

        let result = store.remove("nonexistent").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        // Given a store shared between tasks
        let store = Arc::new(InMemoryCacheStore::new());
        let mut handles = vec![];

        for i in 0..5 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = format!("key_{i}");
                store
                    .put_with_ttl(&key, format!("value_{i}").into_bytes(), 60)
                    .await
                    .unwrap();
                store.get(&key).await.unwrap().unwrap()
            }));
        }

        // Then each task reads back its own value
        for (i, handle) in handles.into_iter().enumerate() {
            let value = handle.await.unwrap();
            assert_eq!(value, format!("value_{i}").into_bytes());
        }
    }
}
