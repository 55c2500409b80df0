//! kv-session - sessions kept in a key-value store
//!
//! A request's session is found through, in order, the session cookie, a
//! token header, or a `token` field in a JSON body. Its data lives in a
//! [`CacheStore`] (in memory or redis) and the session cookie is only sent
//! back to clients that did not identify themselves with a token.
//!
//! Store trouble never fails a request: an unreachable store reads as an
//! empty session and lost writes are only logged.

mod config;
mod session;
mod storage;

pub use config::{
    DEFAULT_CACHE_KEY_PREFIX, DEFAULT_COOKIE_EXPIRY_SECS, DEFAULT_COOKIE_NAME,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_TOKEN_HEADER, MAX_COOKIE_EXPIRY_SECS, SameSite,
    SessionConfig,
};

pub use session::{
    RequestView, SaveOutcome, SessionError, SessionManager, SessionRecord, derive_session_id,
};

pub use storage::{
    CacheStore, InMemoryCacheStore, RedisCacheStore, StorageError, StoreType, build_cache_store,
};

/// Build a [`SessionManager`] from `SESSION_*` environment variables.
pub async fn init() -> Result<SessionManager, SessionError> {
    let config = SessionConfig::from_env()?;
    SessionManager::from_config(config).await
}
