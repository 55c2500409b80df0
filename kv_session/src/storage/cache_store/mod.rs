mod config;
mod memory;
mod redis;
mod types;

pub use config::build_cache_store;
pub use types::{CacheStore, InMemoryCacheStore, RedisCacheStore};
