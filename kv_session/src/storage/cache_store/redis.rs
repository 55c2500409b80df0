use async_trait::async_trait;
use redis::{self, AsyncCommands};

use crate::storage::errors::StorageError;

use super::types::{CacheStore, RedisCacheStore};

impl RedisCacheStore {
    pub fn open(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)
            .map_err(|e| StorageError::Config(format!("invalid redis url {url}: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn init(&self) -> Result<(), StorageError> {
        // Verify the connection works
        let _conn = self.client.get_multiplexed_async_connection().await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn put_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: u64,
    ) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let _: () = conn.set_ex(key, value, ttl).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_accepts_redis_url() {
        let store = RedisCacheStore::open("redis://127.0.0.1:6379");
        assert!(store.is_ok());
    }

    #[test]
    fn test_open_rejects_garbage_url() {
        // Given something that is not a redis connection string
        let store = RedisCacheStore::open("not a url at all");

        // Then it is reported as a configuration problem
        assert!(matches!(store, Err(StorageError::Config(_))));
    }
}
