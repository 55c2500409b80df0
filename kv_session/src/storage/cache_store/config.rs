use std::sync::Arc;

use crate::storage::errors::StorageError;
use crate::storage::types::StoreType;

use super::types::{CacheStore, InMemoryCacheStore, RedisCacheStore};

/// Build the cache store described by `store_type` and `store_urls`.
///
/// For redis every URL is tried in order and the first one that answers is
/// used. When none answers the first URL is kept anyway: session operations
/// then fail open at request time instead of preventing startup.
pub async fn build_cache_store(
    store_type: StoreType,
    store_urls: &[String],
) -> Result<Arc<dyn CacheStore>, StorageError> {
    tracing::info!(
        "Initializing cache store with type: {}, urls: {:?}",
        store_type,
        store_urls
    );

    let store: Arc<dyn CacheStore> = match store_type {
        StoreType::Memory => Arc::new(InMemoryCacheStore::new()),
        StoreType::Redis => Arc::new(connect_first_reachable(store_urls).await?),
    };

    Ok(store)
}

async fn connect_first_reachable(store_urls: &[String]) -> Result<RedisCacheStore, StorageError> {
    let mut candidates = Vec::with_capacity(store_urls.len());
    for url in store_urls {
        candidates.push((url.as_str(), RedisCacheStore::open(url)?));
    }

    let mut first = None;
    for (url, store) in candidates {
        match store.init().await {
            Ok(()) => {
                tracing::info!("Connected to cache store: type=redis, url={}", url);
                return Ok(store);
            }
            Err(e) => {
                tracing::warn!("Cache store at {} is not reachable: {}", url, e);
                if first.is_none() {
                    first = Some(store);
                }
            }
        }
    }

    match first {
        Some(store) => {
            tracing::warn!("No reachable redis endpoint, sessions will fail open until one is");
            Ok(store)
        }
        None => Err(StorageError::Config(
            "at least one store url is required for redis".to_string(),
        )),
    }
}
