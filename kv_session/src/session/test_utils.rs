//! Store doubles shared by the session tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::storage::{CacheStore, InMemoryCacheStore, StorageError};

/// In-memory store that counts every call made to it.
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: InMemoryCacheStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    removes: AtomicUsize,
    last_ttl: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn last_ttl(&self) -> usize {
        self.last_ttl.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn init(&self) -> Result<(), StorageError> {
        self.inner.init().await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: u64,
    ) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.last_ttl.store(ttl as usize, Ordering::SeqCst);
        self.inner.put_with_ttl(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }
}

/// Store whose every operation fails, standing in for an outage.
pub(crate) struct UnavailableStore;

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn init(&self) -> Result<(), StorageError> {
        Err(StorageError::Storage("connection refused".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Storage("connection refused".to_string()))
    }

    async fn put_with_ttl(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: u64,
    ) -> Result<(), StorageError> {
        Err(StorageError::Storage("connection refused".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Storage("connection refused".to_string()))
    }
}
